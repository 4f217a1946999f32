//! Per-host crawl delay.
//!
//! [`RateLimiter`] enforces a minimum spacing between the *starts* of requests
//! to the same host. Requests to different hosts never wait on each other.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pricelist_core::download::RateLimiter;
//!
//! # async fn example() {
//! let limiter = Arc::new(RateLimiter::new(Duration::from_secs(5)));
//!
//! // First request proceeds immediately
//! limiter.acquire("https://www.sgcarmart.com/new-cars/pricelists/1/mg").await;
//!
//! // Second request to the same host waits out the remaining delay
//! limiter.acquire("https://www.sgcarmart.com/new_cars/pricelist/1/2025-01-15.pdf").await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::CUMULATIVE_DELAY_WARNING_THRESHOLD;

/// Per-host crawl-delay limiter.
///
/// Wrap in `Arc` and share across tasks. `DashMap` holds per-host state; the
/// per-host `tokio::sync::Mutex` makes check-sleep-update atomic, which also
/// serializes concurrent callers for the same host.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum delay between request starts to the same host.
    delay: Duration,

    /// Whether pacing is disabled (crawl delay of zero).
    disabled: bool,

    /// Arc lets us release the `DashMap` shard lock before awaiting the Mutex.
    hosts: DashMap<String, Arc<HostState>>,
}

#[derive(Debug)]
struct HostState {
    /// `None` until the first request to this host.
    last_request: Mutex<Option<Instant>>,

    /// Total delay applied to this host, in milliseconds.
    cumulative_delay_ms: AtomicU64,
}

impl HostState {
    fn new() -> Self {
        Self {
            last_request: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

impl RateLimiter {
    /// Creates a limiter with the given crawl delay. A zero delay disables it.
    #[must_use]
    #[instrument(level = "debug", skip_all, fields(delay_ms = delay.as_millis()))]
    pub fn new(delay: Duration) -> Self {
        if delay.is_zero() {
            return Self::disabled();
        }
        debug!("creating rate limiter");
        Self {
            delay,
            disabled: false,
            hosts: DashMap::new(),
        }
    }

    /// Creates a limiter that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        debug!("creating disabled rate limiter");
        Self {
            delay: Duration::ZERO,
            disabled: true,
            hosts: DashMap::new(),
        }
    }

    /// Returns whether pacing is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the configured crawl delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until a request to `url`'s host may start, then records the start.
    ///
    /// The first request to any host proceeds immediately.
    #[instrument(level = "debug", skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        if self.disabled {
            return;
        }

        let host = extract_host(url);
        tracing::Span::current().record("host", &host);

        let state = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(HostState::new()))
            .clone();

        let mut last_request = state.last_request.lock().await;

        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                let wait = self.delay.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(wait);

                debug!(
                    host = %host,
                    delay_ms = wait.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying crawl delay"
                );

                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(
                        host = %host,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "crawl delay has added up; this run will be slow"
                    );
                }

                tokio::time::sleep(wait).await;
            }
        } else {
            debug!(host = %host, "first request to host - no delay");
        }

        *last_request = Some(Instant::now());
    }
}

/// Extracts `host[:port]` from a URL, lowercased.
///
/// Returns "unknown" for malformed URLs so they are still paced.
///
/// ```
/// use pricelist_core::download::rate_limiter::extract_host;
///
/// assert_eq!(extract_host("https://WWW.sgcarmart.com/x"), "www.sgcarmart.com");
/// assert_eq!(extract_host("http://127.0.0.1:8080/x"), "127.0.0.1:8080");
/// assert_eq!(extract_host("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_host(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return "unknown".to_string();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{}:{port}", host.to_lowercase()),
        (Some(host), None) => host.to_lowercase(),
        (None, _) => "unknown".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_new_creates_with_delay() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        assert_eq!(limiter.delay(), Duration::from_millis(500));
        assert!(!limiter.is_disabled());
    }

    #[test]
    fn test_rate_limiter_zero_delay_is_disabled() {
        let limiter = RateLimiter::new(Duration::ZERO);
        assert!(limiter.is_disabled());
        assert_eq!(limiter.delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_rate_limiter_disabled_no_delay() {
        tokio::time::pause();

        let limiter = RateLimiter::disabled();
        let start = Instant::now();

        limiter.acquire("https://example.com/1").await;
        limiter.acquire("https://example.com/2").await;
        limiter.acquire("https://example.com/3").await;

        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_rate_limiter_first_request_no_delay() {
        tokio::time::pause();

        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire("https://example.com/file.pdf").await;

        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_rate_limiter_delays_same_host() {
        tokio::time::pause();

        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();

        limiter.acquire("https://example.com/a").await;
        limiter.acquire("https://example.com/b").await;
        limiter.acquire("https://example.com/c").await;

        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_rate_limiter_different_hosts_independent() {
        tokio::time::pause();

        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();

        limiter.acquire("https://one.example.com/a").await;
        limiter.acquire("https://two.example.com/a").await;
        limiter.acquire("http://one.example.com:8080/a").await;

        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_rate_limiter_serializes_concurrent_callers() {
        tokio::time::pause();

        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(5)));
        let start = Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|i| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire(&format!("https://example.com/{i}")).await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[test]
    fn test_extract_host_variants() {
        assert_eq!(extract_host("https://example.com/path"), "example.com");
        assert_eq!(extract_host("http://Example.COM/Path"), "example.com");
        assert_eq!(extract_host("http://localhost:4000/x"), "localhost:4000");
        assert_eq!(extract_host(""), "unknown");
    }
}

//! Retry logic with exponential backoff.
//!
//! A failed attempt is classified into a [`FailureType`]; the [`RetryPolicy`]
//! decides from that and the attempt count whether to try again and after what
//! delay. By default only [`FailureType::RateLimited`] is retried: a 404 or a
//! malformed payload will not improve by asking again.
//!
//! # Example
//!
//! ```
//! use pricelist_core::download::{
//!     DownloadError, FailureType, RetryDecision, RetryPolicy, classify_error,
//! };
//!
//! let policy = RetryPolicy::default();
//! let error = DownloadError::rate_limited("https://example.com/file.pdf");
//! assert_eq!(classify_error(&error), FailureType::RateLimited);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(attempt, 2);
//!         assert_eq!(delay.as_secs(), 5);
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("{reason}"),
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::DownloadError;

/// Default maximum attempts, including the first.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the second attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Default cap on any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Classification of fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, 5xx server errors, connection refused.
    Transient,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, invalid URL, crawl-policy refusal.
    Permanent,

    /// Server rate limiting (HTTP 429).
    RateLimited,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry configuration with exponential backoff and no jitter.
///
/// # Delay Calculation
///
/// ```text
/// delay after failed attempt n = min(base_delay * multiplier^(n-1), max_delay)
/// ```
///
/// With defaults: 5s after the first failure, 10s after the second, then the
/// third failure is final.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay after the first failed attempt.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Multiplier applied each attempt.
    backoff_multiplier: f32,

    /// Which failure types are worth another attempt.
    retry_on: fn(FailureType) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retry_on: rate_limited_only,
        }
    }
}

fn rate_limited_only(failure_type: FailureType) -> bool {
    failure_type == FailureType::RateLimited
}

impl RetryPolicy {
    /// Creates a retry policy with custom settings. Only rate limiting is
    /// retried; see [`RetryPolicy::retrying`] to widen that.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
            retry_on: rate_limited_only,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Replaces base and maximum delay.
    #[must_use]
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Replaces the predicate selecting retryable failure types.
    #[must_use]
    pub fn retrying(mut self, retry_on: fn(FailureType) -> bool) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if !(self.retry_on)(failure_type) {
            return RetryDecision::DoNotRetry {
                reason: format!("{failure_type:?} failures are not retried"),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Runs `operation` under this policy.
    ///
    /// The operation receives the 1-indexed attempt number. On exhaustion, or
    /// on a failure the policy does not retry, the last error is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<T, E, F, Fut, C>(&self, mut operation: F, classify: C) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> FailureType,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => match self.should_retry(classify(&error), attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next,
                    } => {
                        warn!(attempt, delay_ms = delay.as_millis(), "attempt failed, backing off");
                        tokio::time::sleep(delay).await;
                        attempt = next;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        debug!(attempt, %reason, "giving up");
                        return Err(error);
                    }
                },
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * multiplier.powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }
}

/// Classifies a download error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | `RateLimited` (429) | RateLimited |
/// | `HttpStatus` 408, 5xx | Transient |
/// | `HttpStatus` other | Permanent |
/// | `Timeout`, `Network` | Transient |
/// | `Disallowed`, `Io`, `InvalidUrl` | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::RateLimited { .. } => FailureType::RateLimited,
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
        DownloadError::Timeout { .. } | DownloadError::Network { .. } => FailureType::Transient,
        DownloadError::Disallowed { .. }
        | DownloadError::Redirect { .. }
        | DownloadError::Io { .. }
        | DownloadError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        429 => FailureType::RateLimited,
        408 | 500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(5));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert!((policy.backoff_multiplier - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_retry_policy_max_attempts_minimum_is_one() {
        assert_eq!(RetryPolicy::with_max_attempts(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::with_max_attempts(5).max_attempts(), 5);
    }

    #[test]
    fn test_delay_doubles_without_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.calculate_delay(1), Duration::from_secs(5));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(10));
        assert_eq!(policy.calculate_delay(3), Duration::from_secs(20));
    }

    #[test]
    fn test_delay_respects_max_delay() {
        let policy = RetryPolicy::new(10, Duration::from_secs(5), Duration::from_secs(60), 2.0);
        assert_eq!(policy.calculate_delay(5), Duration::from_secs(60));
        assert_eq!(policy.calculate_delay(9), Duration::from_secs(60));
    }

    #[test]
    fn test_should_retry_rate_limited_until_exhausted() {
        let policy = RetryPolicy::default();
        assert!(matches!(
            policy.should_retry(FailureType::RateLimited, 1),
            RetryDecision::Retry { attempt: 2, .. }
        ));
        assert!(matches!(
            policy.should_retry(FailureType::RateLimited, 2),
            RetryDecision::Retry { attempt: 3, .. }
        ));
        assert!(matches!(
            policy.should_retry(FailureType::RateLimited, 3),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_default_policy_does_not_retry_transient_or_permanent() {
        let policy = RetryPolicy::default();
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 1),
            RetryDecision::DoNotRetry { .. }
        ));
        assert!(matches!(
            policy.should_retry(FailureType::Permanent, 1),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_custom_predicate_retries_transient() {
        let policy = RetryPolicy::default().retrying(|t| t != FailureType::Permanent);
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 1),
            RetryDecision::Retry { .. }
        ));
    }

    #[test]
    fn test_classify_error_table() {
        assert_eq!(
            classify_error(&DownloadError::rate_limited("u")),
            FailureType::RateLimited
        );
        assert_eq!(
            classify_error(&DownloadError::http_status("u", 503)),
            FailureType::Transient
        );
        assert_eq!(
            classify_error(&DownloadError::http_status("u", 404)),
            FailureType::Permanent
        );
        assert_eq!(
            classify_error(&DownloadError::timeout("u")),
            FailureType::Transient
        );
        assert_eq!(
            classify_error(&DownloadError::disallowed("u", "r")),
            FailureType::Permanent
        );
    }

    #[tokio::test]
    async fn test_run_stops_after_max_attempts() {
        let policy = RetryPolicy::default().with_delays(Duration::from_millis(1), Duration::from_millis(5));
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), DownloadError> = policy
            .run(
                |_| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err(DownloadError::rate_limited("u"))
                    }
                },
                classify_error,
            )
            .await;

        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_recovers_after_transient_rate_limit() {
        let policy = RetryPolicy::default().with_delays(Duration::from_millis(1), Duration::from_millis(5));
        let result = policy
            .run(
                |attempt| async move {
                    if attempt < 2 {
                        Err(DownloadError::rate_limited("u"))
                    } else {
                        Ok(attempt)
                    }
                },
                classify_error,
            )
            .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_http_error() {
        let policy = RetryPolicy::default().with_delays(Duration::from_millis(1), Duration::from_millis(5));
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), DownloadError> = policy
            .run(
                |_| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err(DownloadError::http_status("u", 500))
                    }
                },
                classify_error,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

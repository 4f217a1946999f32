//! Policy-checked, paced, retried GETs.
//!
//! Order per attempt: crawl policy (once, before the first attempt), crawl
//! delay, request. Only rate limiting is retried by default. Redirects are
//! followed here, and each target passes the crawl policy before it is requested.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use super::client::{FetchedResponse, HttpClient};
use super::constants::{DOCUMENT_TIMEOUT, MAX_REDIRECTS, PAGE_TIMEOUT};
use super::crawl_policy::CrawlPolicy;
use super::error::DownloadError;
use super::rate_limiter::RateLimiter;
use super::retry::{RetryPolicy, classify_error};

/// Per-kind request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimeouts {
    /// Listing page timeout.
    pub page: Duration,
    /// Document timeout.
    pub document: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            page: PAGE_TIMEOUT,
            document: DOCUMENT_TIMEOUT,
        }
    }
}

/// Everything needed to talk to the site. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Transport {
    client: HttpClient,
    retry: RetryPolicy,
    limiter: Arc<RateLimiter>,
    policy: Arc<CrawlPolicy>,
    timeouts: FetchTimeouts,
}

impl Transport {
    /// Composes a transport with default timeouts.
    #[must_use]
    pub fn new(
        client: HttpClient,
        retry: RetryPolicy,
        limiter: Arc<RateLimiter>,
        policy: CrawlPolicy,
    ) -> Self {
        Self {
            client,
            retry,
            limiter,
            policy: Arc::new(policy),
            timeouts: FetchTimeouts::default(),
        }
    }

    /// Replaces the request timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: FetchTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// The retry policy applied to every fetch.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetches `url` with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns the policy refusal without touching the network, or the last
    /// attempt's error once the retry policy gives up. A redirect to a target
    /// the policy refuses fails with that refusal. After [`MAX_REDIRECTS`] hops
    /// the last [`DownloadError::Redirect`] is returned.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedResponse, DownloadError> {
        let mut current = url.to_string();
        let mut hops = 0;
        loop {
            self.policy.check(&current)?;
            match self.fetch_once(&current, timeout).await {
                Err(DownloadError::Redirect { url: from, location, .. }) if hops < MAX_REDIRECTS => {
                    current = resolve_redirect(&from, &location)?;
                    hops += 1;
                    debug!(to = %current, hops, "following redirect");
                }
                result => return result,
            }
        }
    }

    async fn fetch_once(&self, url: &str, timeout: Duration) -> Result<FetchedResponse, DownloadError> {
        self.retry
            .run(
                |attempt| async move {
                    self.limiter.acquire(url).await;
                    debug!(attempt, "sending request");
                    self.client.get(url, timeout).await
                },
                classify_error,
            )
            .await
    }

    /// Fetches a listing page with the page timeout.
    ///
    /// # Errors
    ///
    /// See [`Transport::fetch`].
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedResponse, DownloadError> {
        self.fetch(url, self.timeouts.page).await
    }

    /// Fetches a document with the document timeout.
    ///
    /// # Errors
    ///
    /// See [`Transport::fetch`].
    pub async fn fetch_document(&self, url: &str) -> Result<FetchedResponse, DownloadError> {
        self.fetch(url, self.timeouts.document).await
    }
}

fn resolve_redirect(from: &str, location: &str) -> Result<String, DownloadError> {
    url::Url::parse(from)
        .and_then(|base| base.join(location))
        .map(String::from)
        .map_err(|_| DownloadError::invalid_url(location))
}

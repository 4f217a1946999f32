//! HTTP client wrapper for single GET requests.
//!
//! One attempt, no retries: [`HttpClient::get`] sends a request, classifies the
//! status and buffers the body. Pacing, crawl policy and retries live in
//! [`Transport`](super::Transport).

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::{Client, redirect};
use tracing::{debug, instrument};

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::DownloadError;
use crate::user_agent::{RandomUserAgentPool, UserAgentProvider};

/// A fully buffered successful response.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// URL that produced this response.
    pub url: String,
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// `Content-Type` header value, when present.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl FetchedResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client that stamps every request with a provider-chosen User-Agent.
///
/// Create once and clone; clones share the connection pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    user_agents: Arc<dyn UserAgentProvider>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").finish_non_exhaustive()
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(Arc::new(RandomUserAgentPool))
    }
}

impl HttpClient {
    /// Creates a client with a 5 second connect timeout and gzip enabled.
    ///
    /// Redirects are not followed here; a 3xx surfaces as
    /// [`DownloadError::Redirect`] for the transport to vet.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(user_agents: Arc<dyn UserAgentProvider>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .gzip(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            user_agents,
        }
    }

    /// Issues one GET with a total `timeout`.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::RateLimited`] on 429
    /// - [`DownloadError::Redirect`] on a 3xx with a `Location` header
    /// - [`DownloadError::HttpStatus`] on any other non-2xx
    /// - [`DownloadError::Timeout`] when `timeout` elapses
    /// - [`DownloadError::Network`] for other transport failures
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedResponse, DownloadError> {
        let user_agent = self.user_agents.next();
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_send_error(url, e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            debug!("server returned 429");
            return Err(DownloadError::rate_limited(url));
        }
        if status.is_redirection() {
            if let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                return Err(DownloadError::redirect(url, status.as_u16(), location));
            }
        }
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_send_error(url, e))?
            .to_vec();

        debug!(bytes = body.len(), status = status.as_u16(), "response received");
        Ok(FetchedResponse {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    /// Returns the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn classify_send_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else if error.is_builder() {
        DownloadError::invalid_url(url)
    } else {
        DownloadError::network(url, error)
    }
}

//! Error types for the download module.
//!
//! Every variant carries the URL or path it concerns, so the `Display` text
//! can be used verbatim as an outcome message.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching or storing a resource.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-2xx response other than 429.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The server answered 429 Too Many Requests.
    #[error("429 Too Many Requests fetching {url}")]
    RateLimited {
        /// The throttled URL.
        url: String,
    },

    /// A 3xx response. The transport follows it after checking the target.
    #[error("HTTP {status} redirect from {url} to {location}")]
    Redirect {
        /// The URL that answered with a redirect.
        url: String,
        /// The 3xx status code.
        status: u16,
        /// Raw `Location` header value.
        location: String,
    },

    /// The request was refused locally by the crawl policy. No I/O happened.
    #[error("refusing to fetch {url}: {reason}")]
    Disallowed {
        /// The refused URL.
        url: String,
        /// Which rule refused it.
        reason: String,
    },

    /// File system error while storing a document.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a rate-limited error.
    pub fn rate_limited(url: impl Into<String>) -> Self {
        Self::RateLimited { url: url.into() }
    }

    /// Creates a redirect error.
    pub fn redirect(url: impl Into<String>, status: u16, location: impl Into<String>) -> Self {
        Self::Redirect {
            url: url.into(),
            status,
            location: location.into(),
        }
    }

    /// Creates a crawl-policy refusal.
    pub fn disallowed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Disallowed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns true for the 429 condition.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs a url or
// path that the source error does not carry. Use the constructors above.

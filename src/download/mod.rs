//! Fetching, validating and storing price-list documents.
//!
//! Layers, bottom up:
//!
//! - [`HttpClient`]: one GET, status classification, User-Agent per attempt
//! - [`Transport`]: crawl policy, per-host crawl delay and [`RetryPolicy`] around the client
//! - [`DocumentDownloader`]: placement, skip-if-present, validation, atomic write
//! - [`DownloadEngine`]: bounded fan-out over many documents
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pricelist_core::download::{
//!     CrawlPolicy, DocumentDownloader, HttpClient, RateLimiter, RetryPolicy, Transport,
//! };
//! use pricelist_core::outcome::DocumentReference;
//! use pricelist_core::site::Site;
//!
//! # async fn example() {
//! let site = Site::default();
//! let transport = Transport::new(
//!     HttpClient::default(),
//!     RetryPolicy::default(),
//!     Arc::new(RateLimiter::new(Duration::from_secs(5))),
//!     CrawlPolicy::for_site(&site),
//! );
//! let downloader = DocumentDownloader::new(transport, "./pricelists");
//! let doc = DocumentReference::from_url(site.document_url("82", "2025-01-15"), Some("MG"));
//! let outcome = downloader.download(&doc).await;
//! println!("{}", outcome.progress_line());
//! # }
//! ```

mod client;
pub mod constants;
mod crawl_policy;
mod document;
mod engine;
mod error;
pub mod placement;
pub mod rate_limiter;
mod retry;
pub mod robots;
mod transport;
mod validation;

pub use client::{FetchedResponse, HttpClient};
pub use crawl_policy::CrawlPolicy;
pub use document::DocumentDownloader;
pub use engine::{DEFAULT_CONCURRENCY, DownloadEngine, EngineError, ProgressFn, check_concurrency};
pub use error::DownloadError;
pub use rate_limiter::{RateLimiter, extract_host};
pub use retry::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, FailureType, RetryDecision,
    RetryPolicy, classify_error,
};
pub use robots::{RobotsError, RobotsRules, fetch_robots_rules, parse_robots};
pub use transport::{FetchTimeouts, Transport};
pub use validation::{ValidationFailure, validate_pdf};

// No module-local Result aliases; write `Result<T, DownloadError>` explicitly.

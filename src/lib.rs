//! Price-list fetcher core library.
//!
//! Retrieves dealer price-list documents from a car retail site, validates
//! them, files them by brand and year, and reports one outcome per unit of
//! work.
//!
//! # Architecture
//!
//! - [`site`] - URL layout of the site (listing pages, documents)
//! - [`listing`] - Listing page scraping and URL metadata extraction
//! - [`download`] - Transport, validation, placement and batch fan-out
//! - [`dealer`] - Newest-document-per-dealer flow
//! - [`discovery`] - Historical document sources
//! - [`mapping`] - Dealer to brand mapping file
//! - [`report`] - JSON run reports
//! - [`outcome`] - Result records shared by all flows
//! - [`user_agent`] - User-Agent providers

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dealer;
pub mod discovery;
pub mod download;
pub mod listing;
pub mod mapping;
pub mod outcome;
pub mod report;
pub mod site;
pub mod user_agent;

// Re-export commonly used types
pub use dealer::{DEFAULT_DEALER_CONCURRENCY, DealerProcessor};
pub use discovery::{HistoricalDiscovery, HistoricalIndex};
pub use download::{
    CrawlPolicy, DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, DocumentDownloader, DownloadEngine,
    DownloadError, EngineError, HttpClient, RateLimiter, RetryPolicy, Transport,
};
pub use mapping::{DealerBrandMapping, MappingError};
pub use outcome::{DealerOutcome, DealerStatus, DocumentReference, DownloadOutcome, DownloadStatus};
pub use report::{DealerReport, DownloadReport, RunMode, write_report};
pub use site::Site;

//! Constants for the download module (timeouts, pacing, validation).

use std::time::Duration;

/// HTTP connect timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Total timeout for a listing page request.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Total timeout for a document request.
pub const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Redirect hops a single fetch may follow.
pub const MAX_REDIRECTS: usize = 5;

/// Minimum spacing between request starts to the same host.
pub const DEFAULT_CRAWL_DELAY: Duration = Duration::from_secs(5);

/// Warning threshold for cumulative crawl delay per host (30 seconds).
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Documents smaller than this are rejected.
pub const MIN_DOCUMENT_SIZE: usize = 1000;

/// Leading bytes every accepted document must start with.
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// MIME type expected in the `Content-Type` header, when one is present.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

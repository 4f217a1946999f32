//! Bounded fan-out of document downloads.
//!
//! The engine turns a listing page (or any list of references) into one
//! [`DownloadOutcome`] per document, running at most `concurrency` downloads at
//! once. Outcomes are returned in completion order.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pricelist_core::download::{
//!     CrawlPolicy, DocumentDownloader, DownloadEngine, HttpClient, RateLimiter, RetryPolicy,
//!     Transport,
//! };
//! use pricelist_core::site::Site;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let site = Site::default();
//! let transport = Transport::new(
//!     HttpClient::default(),
//!     RetryPolicy::default(),
//!     Arc::new(RateLimiter::new(std::time::Duration::from_secs(5))),
//!     CrawlPolicy::for_site(&site),
//! );
//! let downloader = DocumentDownloader::new(transport, "./pricelists");
//! let engine = DownloadEngine::new(5, downloader, site.clone())?;
//! let outcomes = engine
//!     .download_all_from_listing(&site.listing_url("82", "MG"), None)
//!     .await;
//! println!("{} documents attempted", outcomes.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, instrument, warn};

use super::document::DocumentDownloader;
use crate::discovery::HistoricalDiscovery;
use crate::listing::{ListingMarkers, extract_brand, scrape_listing_links_with};
use crate::outcome::{DocumentReference, DownloadOutcome};
use crate::site::Site;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default number of simultaneous document downloads.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Callback invoked once per outcome as it completes.
pub type ProgressFn = Arc<dyn Fn(&DownloadOutcome) + Send + Sync>;

/// Error type for download engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Validates a worker-pool size.
///
/// # Errors
///
/// Returns [`EngineError::InvalidConcurrency`] outside `1..=100`.
pub fn check_concurrency(concurrency: usize) -> Result<(), EngineError> {
    if (MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
        Ok(())
    } else {
        Err(EngineError::InvalidConcurrency { value: concurrency })
    }
}

/// Page-level and batch download coordinator.
///
/// # Concurrency Model
///
/// - Each document runs in its own Tokio task
/// - Each task acquires a semaphore permit and releases it when it ends
/// - Finished outcomes flow back over a channel, so results arrive in completion order
/// - A task that panics still yields one `error` outcome for its reference
pub struct DownloadEngine {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    downloader: DocumentDownloader,
    site: Site,
    markers: ListingMarkers,
    progress: Option<ProgressFn>,
}

impl std::fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("concurrency", &self.concurrency)
            .field("site", &self.site)
            .finish_non_exhaustive()
    }
}

impl DownloadEngine {
    /// Creates an engine running at most `concurrency` downloads at once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    #[instrument(level = "debug", skip(downloader, site))]
    pub fn new(
        concurrency: usize,
        downloader: DocumentDownloader,
        site: Site,
    ) -> Result<Self, EngineError> {
        check_concurrency(concurrency)?;
        debug!(
            concurrency,
            output_root = %downloader.output_root().display(),
            "creating download engine"
        );
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            downloader,
            site,
            markers: ListingMarkers::default(),
            progress: None,
        })
    }

    /// Installs a per-outcome progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Overrides the listing page markers.
    #[must_use]
    pub fn with_markers(mut self, markers: ListingMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The single-document downloader shared by every task.
    #[must_use]
    pub fn downloader(&self) -> &DocumentDownloader {
        &self.downloader
    }

    /// Fetches a listing page and returns the document references it links to.
    ///
    /// Any fetch failure is logged and yields an empty list: it means "nothing
    /// discoverable this run", not a fatal error. When `brand` is `None` it is
    /// derived from the page URL.
    #[instrument(skip(self), fields(url = %page_url))]
    pub async fn listing_references(
        &self,
        page_url: &str,
        brand: Option<&str>,
    ) -> Vec<DocumentReference> {
        let brand = brand.map(str::to_string).or_else(|| extract_brand(page_url));

        let page = match self.downloader.transport().fetch_page(page_url).await {
            Ok(page) => page,
            Err(error) => {
                warn!(error = %error, "listing page unavailable");
                return Vec::new();
            }
        };

        let links = scrape_listing_links_with(&page.text(), &self.markers);
        if links.is_empty() {
            info!("no documents linked from listing page");
        }

        links
            .iter()
            .map(|link| DocumentReference::from_url(self.site.resolve(link), brand.as_deref()))
            .collect()
    }

    /// Downloads every document linked from a listing page.
    #[instrument(skip(self), fields(url = %page_url))]
    pub async fn download_all_from_listing(
        &self,
        page_url: &str,
        brand: Option<&str>,
    ) -> Vec<DownloadOutcome> {
        let references = self.listing_references(page_url, brand).await;
        if references.is_empty() {
            return Vec::new();
        }
        info!(count = references.len(), "found documents");
        self.download_references(references).await
    }

    /// Downloads every reference, one outcome each, in completion order.
    pub async fn download_references(
        &self,
        references: Vec<DocumentReference>,
    ) -> Vec<DownloadOutcome> {
        let total = references.len();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(total);

        // Tasks wait for their permit inside the spawn so outcomes stream
        // to `rx` while later items are still queued.
        for reference in references {
            let semaphore = Arc::clone(&self.semaphore);
            let downloader = self.downloader.clone();
            let tx = tx.clone();
            let task_reference = reference.clone();
            let handle = tokio::spawn(async move {
                // The semaphore is never closed, so this is always Ok.
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = downloader.download(&task_reference).await;
                let _ = tx.send(outcome);
            });
            handles.push((reference, handle));
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            self.report(&outcome);
            outcomes.push(outcome);
        }

        for (reference, handle) in handles {
            if let Err(join_error) = handle.await {
                warn!(url = %reference.url, error = %join_error, "download task did not finish");
                let outcome =
                    DownloadOutcome::error(reference, format!("download task failed: {join_error}"));
                self.report(&outcome);
                outcomes.push(outcome);
            }
        }

        debug!(total, returned = outcomes.len(), "batch complete");
        outcomes
    }

    /// Downloads everything a historical discovery source knows for a dealer,
    /// newest year first.
    #[instrument(skip(self, discovery))]
    pub async fn download_historical(
        &self,
        discovery: &dyn HistoricalDiscovery,
        dealer_id: &str,
        brand: &str,
    ) -> Vec<DownloadOutcome> {
        let by_year = discovery.discover(dealer_id, brand).await;
        let references: Vec<DocumentReference> = by_year
            .into_iter()
            .rev()
            .flat_map(|(_, references)| references)
            .map(|mut reference| {
                reference.url = self.site.resolve(&reference.url);
                reference.brand.get_or_insert_with(|| brand.to_string());
                reference.dealer_id.get_or_insert_with(|| dealer_id.to_string());
                reference
            })
            .collect();

        if references.is_empty() {
            info!("no historical documents discovered");
            return Vec::new();
        }
        info!(count = references.len(), "discovered historical documents");
        self.download_references(references).await
    }

    fn report(&self, outcome: &DownloadOutcome) {
        if let Some(progress) = &self.progress {
            progress(outcome);
        }
    }
}

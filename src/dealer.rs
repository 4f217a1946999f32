//! Newest-document-per-dealer flow.
//!
//! For each dealer/brand pair: fetch the listing page, take the first linked
//! document, download it. The first link is assumed to be the newest; the
//! listing order is the site's own and is not re-sorted here.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, instrument, warn};

use crate::download::{DocumentDownloader, EngineError, check_concurrency};
use crate::listing::{ListingMarkers, scrape_listing_links_with};
use crate::outcome::{DealerOutcome, DocumentReference};
use crate::site::Site;

/// Default number of dealers processed at once.
pub const DEFAULT_DEALER_CONCURRENCY: usize = 10;

/// Callback invoked once per dealer as it completes.
pub type DealerProgressFn = Arc<dyn Fn(&DealerOutcome) + Send + Sync>;

/// Runs the newest-document flow for one or many dealers.
#[derive(Clone)]
pub struct DealerProcessor {
    downloader: DocumentDownloader,
    site: Site,
    markers: ListingMarkers,
    concurrency: usize,
    progress: Option<DealerProgressFn>,
}

impl std::fmt::Debug for DealerProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DealerProcessor")
            .field("site", &self.site)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl DealerProcessor {
    /// Creates a processor handling at most `concurrency` dealers at once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] outside `1..=100`.
    pub fn new(
        concurrency: usize,
        downloader: DocumentDownloader,
        site: Site,
    ) -> Result<Self, EngineError> {
        check_concurrency(concurrency)?;
        Ok(Self {
            downloader,
            site,
            markers: ListingMarkers::default(),
            concurrency,
            progress: None,
        })
    }

    /// Installs a per-dealer progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: DealerProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Overrides the listing page markers.
    #[must_use]
    pub fn with_markers(mut self, markers: ListingMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Downloads the newest document for one dealer.
    #[instrument(skip(self))]
    pub async fn process_dealer(&self, dealer_id: &str, brand: &str) -> DealerOutcome {
        let listing_url = self.site.listing_url(dealer_id, brand);

        let page = match self.downloader.transport().fetch_page(&listing_url).await {
            Ok(page) => page,
            Err(error) => {
                warn!(error = %error, "listing page unavailable");
                let message = self.downloader.describe_fetch_error(&error);
                return DealerOutcome::error(dealer_id, brand, message);
            }
        };

        let links = scrape_listing_links_with(&page.text(), &self.markers);
        let Some(newest) = links.first() else {
            info!("no price lists listed");
            return DealerOutcome::not_found(dealer_id, brand);
        };

        let reference = DocumentReference::from_url(self.site.resolve(newest), Some(brand))
            .with_dealer_id(dealer_id);
        debug!(url = %reference.url, date = %reference.date, "newest price list");

        let outcome = self.downloader.download(&reference).await;
        DealerOutcome::from_document(dealer_id, brand, outcome)
    }

    /// Runs [`process_dealer`](Self::process_dealer) for every pair, returning
    /// outcomes in completion order.
    pub async fn process_all<I, D, B>(&self, dealers: I) -> Vec<DealerOutcome>
    where
        I: IntoIterator<Item = (D, B)>,
        D: Into<String>,
        B: Into<String>,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles = Vec::new();

        for (dealer_id, brand) in dealers {
            let dealer_id: String = dealer_id.into();
            let brand: String = brand.into();
            let semaphore = Arc::clone(&semaphore);
            let processor = self.clone();
            let tx = tx.clone();
            let (task_dealer, task_brand) = (dealer_id.clone(), brand.clone());
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = processor.process_dealer(&task_dealer, &task_brand).await;
                let _ = tx.send(outcome);
            });
            handles.push((dealer_id, brand, handle));
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(handles.len());
        while let Some(outcome) = rx.recv().await {
            self.report(&outcome);
            outcomes.push(outcome);
        }

        for (dealer_id, brand, handle) in handles {
            if let Err(join_error) = handle.await {
                warn!(dealer_id, error = %join_error, "dealer task did not finish");
                let outcome = DealerOutcome::error(&dealer_id, &brand, format!("Failed: {join_error}"));
                self.report(&outcome);
                outcomes.push(outcome);
            }
        }

        outcomes
    }

    fn report(&self, outcome: &DealerOutcome) {
        if let Some(progress) = &self.progress {
            progress(outcome);
        }
    }
}

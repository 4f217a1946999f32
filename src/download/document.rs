//! Single-document download: place, skip, fetch, validate, write.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::error::DownloadError;
use super::placement::{target_path, write_atomic};
use super::transport::Transport;
use super::validation::validate_pdf;
use crate::outcome::{DocumentReference, DownloadOutcome};

/// Downloads documents into an output root. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DocumentDownloader {
    transport: Transport,
    output_root: PathBuf,
}

impl DocumentDownloader {
    /// Creates a downloader writing under `output_root`.
    #[must_use]
    pub fn new(transport: Transport, output_root: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            output_root: output_root.into(),
        }
    }

    /// The transport used for every request.
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Root directory documents are placed under.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Retrieves one document. Never fails: every problem becomes an outcome.
    ///
    /// An existing file at the target path short-circuits with `skipped`
    /// before any network call.
    #[instrument(skip(self, document), fields(url = %document.url, dealer_id = ?document.dealer_id))]
    pub async fn download(&self, document: &DocumentReference) -> DownloadOutcome {
        let path = target_path(&self.output_root, document);

        if let Ok(metadata) = tokio::fs::metadata(&path).await {
            if metadata.is_file() {
                debug!(path = %path.display(), "already on disk");
                return DownloadOutcome::skipped(document.clone(), path, metadata.len());
            }
        }

        let response = match self.transport.fetch_document(&document.url).await {
            Ok(response) => response,
            Err(error) => {
                let message = self.describe_fetch_error(&error);
                warn!(error = %error, "document fetch failed");
                return DownloadOutcome::error(document.clone(), message);
            }
        };

        if let Err(reason) = validate_pdf(&response.body, response.content_type.as_deref()) {
            warn!(%reason, "document rejected");
            return DownloadOutcome::failed(document.clone(), reason.to_string());
        }

        if let Err(error) = write_atomic(&path, &response.body).await {
            warn!(error = %error, "could not store document");
            return DownloadOutcome::error(document.clone(), error.to_string());
        }

        info!(path = %path.display(), bytes = response.body.len(), "downloaded");
        DownloadOutcome::success(document.clone(), path, response.body.len())
    }

    /// Outcome text for a fetch that could not complete.
    pub(crate) fn describe_fetch_error(&self, error: &DownloadError) -> String {
        if error.is_rate_limited() {
            format!(
                "429 Too Many Requests after {} attempts",
                self.transport.retry_policy().max_attempts()
            )
        } else {
            error.to_string()
        }
    }
}

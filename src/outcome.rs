//! Records describing units of work and their results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::listing::extract_metadata;

/// Identifies one retrievable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    /// Absolute or site-relative URL.
    pub url: String,
    /// Dealer identifier, when derivable from the URL or supplied by the caller.
    pub dealer_id: Option<String>,
    /// Final URL segment without `.pdf`. Opaque apart from its year prefix.
    pub date: String,
    /// Human-cased or normalized brand, when known.
    #[serde(default)]
    pub brand: Option<String>,
}

impl DocumentReference {
    /// Builds a reference from a document URL, deriving dealer id and date.
    #[must_use]
    pub fn from_url(url: impl Into<String>, brand: Option<&str>) -> Self {
        let url = url.into();
        let metadata = extract_metadata(&url);
        Self {
            url,
            dealer_id: metadata.dealer_id,
            date: metadata.date,
            brand: brand.map(str::to_string),
        }
    }

    /// Overrides the dealer id derived from the URL.
    #[must_use]
    pub fn with_dealer_id(mut self, dealer_id: impl Into<String>) -> Self {
        self.dealer_id = Some(dealer_id.into());
        self
    }

    /// Name shown in progress output: `dealer_{id}_{date}.pdf` when both are
    /// known, otherwise the last URL segment.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.dealer_id {
            Some(dealer_id) if !self.date.is_empty() => {
                format!("dealer_{dealer_id}_{}.pdf", self.date)
            }
            _ => self
                .url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Result category of a single document attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// A new, validated file was written.
    Success,
    /// The file already existed; nothing was fetched.
    Skipped,
    /// The fetch completed but the payload failed validation.
    Failed,
    /// The fetch itself could not complete.
    Error,
}

impl DownloadStatus {
    /// Progress marker: ✓ success, ○ skipped, ✗ otherwise.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Skipped => "○",
            Self::Failed | Self::Error => "✗",
        }
    }
}

/// The result of attempting one document retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// The reference that was attempted.
    #[serde(flatten)]
    pub document: DocumentReference,
    /// Present only when a file exists on disk for this reference.
    #[serde(rename = "filepath")]
    pub file_path: Option<PathBuf>,
    /// Result category.
    pub status: DownloadStatus,
    /// Human-readable detail.
    pub message: String,
}

impl DownloadOutcome {
    pub(crate) fn success(document: DocumentReference, path: PathBuf, bytes: usize) -> Self {
        Self {
            document,
            file_path: Some(path),
            status: DownloadStatus::Success,
            message: format!("Downloaded ({bytes} bytes)"),
        }
    }

    pub(crate) fn skipped(document: DocumentReference, path: PathBuf, bytes: u64) -> Self {
        Self {
            document,
            file_path: Some(path),
            status: DownloadStatus::Skipped,
            message: format!("Already exists ({bytes} bytes)"),
        }
    }

    pub(crate) fn failed(document: DocumentReference, message: impl Into<String>) -> Self {
        Self {
            document,
            file_path: None,
            status: DownloadStatus::Failed,
            message: message.into(),
        }
    }

    pub(crate) fn error(document: DocumentReference, message: impl Into<String>) -> Self {
        Self {
            document,
            file_path: None,
            status: DownloadStatus::Error,
            message: message.into(),
        }
    }

    /// One progress line: `{symbol} {name}: {message}`.
    #[must_use]
    pub fn progress_line(&self) -> String {
        format!(
            "{} {}: {}",
            self.status.symbol(),
            self.document.display_name(),
            self.message
        )
    }
}

/// Result category of a dealer-level run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealerStatus {
    /// The newest document is on disk.
    Success,
    /// A document was found but could not be stored.
    Failed,
    /// The listing page had no document links.
    NotFound,
    /// The listing page could not be fetched.
    Error,
}

impl DealerStatus {
    /// Progress marker: ✓ success, ○ nothing listed, ✗ otherwise.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::NotFound => "○",
            Self::Failed | Self::Error => "✗",
        }
    }
}

/// The single record produced for one dealer/brand pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealerOutcome {
    /// Dealer identifier.
    pub dealer_id: String,
    /// Brand as supplied by the caller.
    pub brand: String,
    /// Absolute URL of the newest document, when one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Date label of the newest document, when one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Stored file, on success.
    #[serde(
        rename = "filepath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub file_path: Option<PathBuf>,
    /// Result category.
    pub status: DealerStatus,
    /// Failure detail for `failed` and `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DealerOutcome {
    pub(crate) fn not_found(dealer_id: &str, brand: &str) -> Self {
        Self {
            dealer_id: dealer_id.to_string(),
            brand: brand.to_string(),
            url: None,
            date: None,
            file_path: None,
            status: DealerStatus::NotFound,
            error: None,
        }
    }

    pub(crate) fn error(dealer_id: &str, brand: &str, message: impl Into<String>) -> Self {
        Self {
            status: DealerStatus::Error,
            error: Some(message.into()),
            ..Self::not_found(dealer_id, brand)
        }
    }

    /// One-line progress text: `{symbol} {brand} ({dealer_id}): {detail}`.
    #[must_use]
    pub fn progress_line(&self) -> String {
        let detail = match self.status {
            DealerStatus::Success => self.date.as_deref().unwrap_or("downloaded"),
            DealerStatus::NotFound => "no price lists found",
            DealerStatus::Failed | DealerStatus::Error => self.error.as_deref().unwrap_or("failed"),
        };
        format!(
            "{} {} ({}): {detail}",
            self.status.symbol(),
            self.brand,
            self.dealer_id
        )
    }

    /// Maps the document attempt for the newest link to a dealer record.
    ///
    /// `success` and `skipped` both mean the document is on disk.
    pub(crate) fn from_document(dealer_id: &str, brand: &str, outcome: DownloadOutcome) -> Self {
        let DownloadOutcome {
            document,
            file_path,
            status,
            message,
        } = outcome;
        let base = Self {
            url: Some(document.url),
            date: Some(document.date),
            ..Self::not_found(dealer_id, brand)
        };
        match status {
            DownloadStatus::Success | DownloadStatus::Skipped => Self {
                file_path,
                status: DealerStatus::Success,
                ..base
            },
            DownloadStatus::Failed | DownloadStatus::Error => Self {
                status: DealerStatus::Failed,
                error: Some(message),
                ..base
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_from_url_derives_metadata() {
        let doc = DocumentReference::from_url(
            "https://host/new_cars/pricelist/82/2025-01-15.pdf",
            Some("MG"),
        );
        assert_eq!(doc.dealer_id.as_deref(), Some("82"));
        assert_eq!(doc.date, "2025-01-15");
        assert_eq!(doc.brand.as_deref(), Some("MG"));
        assert_eq!(doc.display_name(), "dealer_82_2025-01-15.pdf");
    }

    #[test]
    fn test_display_name_falls_back_to_last_segment() {
        let doc = DocumentReference::from_url("https://host/files/report.pdf", None);
        assert_eq!(doc.display_name(), "report.pdf");
    }

    #[test]
    fn test_status_symbols() {
        assert_eq!(DownloadStatus::Success.symbol(), "✓");
        assert_eq!(DownloadStatus::Skipped.symbol(), "○");
        assert_eq!(DownloadStatus::Failed.symbol(), "✗");
        assert_eq!(DownloadStatus::Error.symbol(), "✗");
    }

    #[test]
    fn test_download_outcome_serializes_flat_record() {
        let doc = DocumentReference::from_url("https://host/new_cars/pricelist/4/2025-01-15.pdf", None);
        let outcome = DownloadOutcome::failed(doc, "Invalid PDF header");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["url"], "https://host/new_cars/pricelist/4/2025-01-15.pdf");
        assert_eq!(value["dealer_id"], "4");
        assert_eq!(value["date"], "2025-01-15");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["message"], "Invalid PDF header");
        assert!(value["filepath"].is_null());
    }

    #[test]
    fn test_dealer_progress_line() {
        let missing = DealerOutcome::not_found("82", "MG");
        assert_eq!(missing.progress_line(), "○ MG (82): no price lists found");

        let broken = DealerOutcome::error("82", "MG", "HTTP 500 fetching x");
        assert_eq!(broken.progress_line(), "✗ MG (82): HTTP 500 fetching x");
    }

    #[test]
    fn test_dealer_not_found_serializes_without_optional_fields() {
        let outcome = DealerOutcome::not_found("82", "MG");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "not_found");
        assert_eq!(value["dealer_id"], "82");
        assert!(value.get("url").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_dealer_from_document_maps_statuses() {
        let doc = DocumentReference::from_url("https://host/new_cars/pricelist/4/2025-01-15.pdf", Some("BMW"));
        let skipped = DownloadOutcome::skipped(doc.clone(), PathBuf::from("/tmp/x.pdf"), 10);
        let dealer = DealerOutcome::from_document("4", "BMW", skipped);
        assert_eq!(dealer.status, DealerStatus::Success);
        assert_eq!(dealer.file_path, Some(PathBuf::from("/tmp/x.pdf")));

        let errored = DownloadOutcome::error(doc, "HTTP 500");
        let dealer = DealerOutcome::from_document("4", "BMW", errored);
        assert_eq!(dealer.status, DealerStatus::Failed);
        assert_eq!(dealer.error.as_deref(), Some("HTTP 500"));
        assert_eq!(dealer.date.as_deref(), Some("2025-01-15"));
    }
}

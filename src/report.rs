//! JSON run reports.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::outcome::{DealerOutcome, DealerStatus, DownloadOutcome, DownloadStatus};

/// Report file prefix for the newest-per-dealer flow.
pub const DEALER_REPORT_PREFIX: &str = "download_report";

/// Report file prefix for page-level and historical flows.
pub const DOCUMENT_REPORT_PREFIX: &str = "pdf_download_report";

/// Errors writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report directory could not be created.
    #[error("failed to create report directory {path}: {source}")]
    CreateDir {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The report could not be serialized.
    #[error("failed to serialize report: {0}")]
    Serialize(#[source] serde_json::Error),
    /// The report file could not be written.
    #[error("failed to write report {path}: {source}")]
    Write {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Which flow produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Newest document per dealer.
    Latest,
    /// Every document for every dealer.
    All,
    /// Every document for one brand's dealers.
    Brand,
    /// Every document on one listing page.
    Page,
    /// Historical documents from a discovery index.
    History,
}

/// Counts derived from a result list.
pub trait Summary<T>: Serialize {
    /// Tallies `results`.
    fn from_results(results: &[T]) -> Self;
}

/// Tally of document outcomes. `failed` counts both `failed` and `error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadSummary {
    /// Outcomes in the run.
    pub total: usize,
    /// Newly written.
    pub downloaded: usize,
    /// Already on disk.
    pub skipped: usize,
    /// Rejected or not fetched.
    pub failed: usize,
}

impl Summary<DownloadOutcome> for DownloadSummary {
    fn from_results(results: &[DownloadOutcome]) -> Self {
        results.iter().fold(
            Self {
                total: results.len(),
                ..Self::default()
            },
            |mut acc, outcome| {
                match outcome.status {
                    DownloadStatus::Success => acc.downloaded += 1,
                    DownloadStatus::Skipped => acc.skipped += 1,
                    DownloadStatus::Failed | DownloadStatus::Error => acc.failed += 1,
                }
                acc
            },
        )
    }
}

/// Tally of dealer outcomes. `found` counts `success` and `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DealerSummary {
    /// Dealers scanned.
    pub total: usize,
    /// Dealers with at least one listed document.
    pub found: usize,
    /// Dealers whose newest document is on disk.
    pub downloaded: usize,
    /// Dealers with no listed documents.
    pub not_found: usize,
    /// Dealers whose listing page could not be fetched.
    pub errors: usize,
}

impl Summary<DealerOutcome> for DealerSummary {
    fn from_results(results: &[DealerOutcome]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for outcome in results {
            match outcome.status {
                DealerStatus::Success => {
                    summary.found += 1;
                    summary.downloaded += 1;
                }
                DealerStatus::Failed => summary.found += 1,
                DealerStatus::NotFound => summary.not_found += 1,
                DealerStatus::Error => summary.errors += 1,
            }
        }
        summary
    }
}

/// One run's results plus metadata, as written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<T, S> {
    /// Flow that produced the results.
    pub mode: RunMode,
    /// Brand filter, when one was given.
    pub brand_filter: Option<String>,
    /// Output root documents were placed under.
    pub output_directory: PathBuf,
    /// When the report was built.
    pub timestamp: DateTime<Local>,
    /// Per-unit results.
    pub results: Vec<T>,
    /// Counts over `results`.
    pub summary: S,
}

impl<T: Serialize, S: Summary<T>> RunReport<T, S> {
    /// Builds a report stamped with the current local time.
    #[must_use]
    pub fn new(
        mode: RunMode,
        brand_filter: Option<String>,
        output_directory: impl Into<PathBuf>,
        results: Vec<T>,
    ) -> Self {
        let summary = S::from_results(&results);
        Self {
            mode,
            brand_filter,
            output_directory: output_directory.into(),
            timestamp: Local::now(),
            results,
            summary,
        }
    }
}

/// Report over document outcomes.
pub type DownloadReport = RunReport<DownloadOutcome, DownloadSummary>;

/// Report over dealer outcomes.
pub type DealerReport = RunReport<DealerOutcome, DealerSummary>;

/// Writes `report` as pretty JSON to `{dir}/{prefix}_{YYYYmmdd_HHMMSS}.json`.
///
/// `dir` is created if needed. Returns the written path.
///
/// # Errors
///
/// Returns [`ReportError`] if the directory, serialization or write fails.
pub fn write_report<R: Serialize>(dir: &Path, prefix: &str, report: &R) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{prefix}_{stamp}.json"));
    let json = serde_json::to_string_pretty(report).map_err(ReportError::Serialize)?;
    std::fs::write(&path, json).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), "report written");
    Ok(path)
}

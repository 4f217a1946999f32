//! Operator-facing progress and summaries.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use pricelist_core::dealer::DealerProgressFn;
use pricelist_core::download::ProgressFn;
use pricelist_core::outcome::{DealerOutcome, DownloadOutcome};
use pricelist_core::report::{DealerSummary, DownloadSummary};

/// Progress display shared by the running tasks.
///
/// Each finished item prints one line above the bar. Hidden when quiet.
#[derive(Clone)]
pub(crate) struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// A bar over a known number of items.
    pub(crate) fn bounded(total: usize, quiet: bool) -> Self {
        if quiet {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// A spinner for runs whose size is discovered as they go.
    pub(crate) fn unbounded(quiet: bool) -> Self {
        if quiet {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub(crate) fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Callback for document outcomes.
    pub(crate) fn documents(&self) -> ProgressFn {
        let bar = self.bar.clone();
        Arc::new(move |outcome: &DownloadOutcome| {
            bar.println(outcome.progress_line());
            bar.inc(1);
        })
    }

    /// Callback for dealer outcomes.
    pub(crate) fn dealers(&self) -> DealerProgressFn {
        let bar = self.bar.clone();
        Arc::new(move |outcome: &DealerOutcome| {
            bar.println(outcome.progress_line());
            bar.inc(1);
        })
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

pub(crate) fn print_download_summary(summary: &DownloadSummary, report_path: &Path) {
    println!();
    println!("Summary");
    println!("  total:      {}", summary.total);
    println!("  downloaded: {}", summary.downloaded);
    println!("  skipped:    {}", summary.skipped);
    println!("  failed:     {}", summary.failed);
    println!("Report: {}", report_path.display());
}

pub(crate) fn print_dealer_summary(summary: &DealerSummary, report_path: &Path) {
    println!();
    println!("Summary");
    println!("  dealers:    {}", summary.total);
    println!("  found:      {}", summary.found);
    println!("  downloaded: {}", summary.downloaded);
    println!("  not found:  {}", summary.not_found);
    println!("  errors:     {}", summary.errors);
    println!("Report: {}", report_path.display());
}

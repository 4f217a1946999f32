//! Historical document discovery.
//!
//! Older price lists are not linked from the listing page; they sit behind a
//! year picker and a date picker that need a real browser to drive. That
//! browser session lives outside this crate. What comes back from it, a map of
//! year to document references, is consumed here through
//! [`HistoricalDiscovery`] and downloaded on the same path as listing links.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::outcome::DocumentReference;
use crate::site::Site;

/// Year label to the documents published in that year.
pub type DocumentsByYear = BTreeMap<String, Vec<DocumentReference>>;

/// Source of historical document references for a dealer.
///
/// Implementations absorb their own failures and return an empty map.
///
/// # Object Safety
///
/// Uses `async_trait` so the engine can take `&dyn HistoricalDiscovery`.
#[async_trait]
pub trait HistoricalDiscovery: Send + Sync {
    /// Returns every known document for the dealer, keyed by year label.
    async fn discover(&self, dealer_id: &str, brand: &str) -> DocumentsByYear;
}

/// Errors loading a [`HistoricalIndex`].
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index file could not be read.
    #[error("failed to read discovery index {path}: {source}")]
    Read {
        /// File that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The index file is not the expected JSON shape.
    #[error("malformed discovery index {path}: {source}")]
    Parse {
        /// File that failed.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct IndexEntry {
    url: String,
    #[serde(default)]
    date: Option<String>,
}

/// A recorded discovery session: dealer id, then year, then `[{url, date}]`.
///
/// ```json
/// { "82": { "2024": [ { "url": "/new_cars/pricelist/82/2024-10-14.pdf", "date": "2024-10-14" } ] } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct HistoricalIndex {
    dealers: BTreeMap<String, BTreeMap<String, Vec<IndexEntry>>>,
}

impl HistoricalIndex {
    /// Loads an index from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Read`] or [`IndexError::Parse`].
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let text = std::fs::read_to_string(path).map_err(|source| IndexError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| IndexError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parses an index from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the shape does not match.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Dealer ids present in the index.
    pub fn dealer_ids(&self) -> impl Iterator<Item = &str> {
        self.dealers.keys().map(String::as_str)
    }
}

#[async_trait]
impl HistoricalDiscovery for HistoricalIndex {
    async fn discover(&self, dealer_id: &str, brand: &str) -> DocumentsByYear {
        let Some(years) = self.dealers.get(dealer_id) else {
            debug!(dealer_id, "dealer not in discovery index");
            return DocumentsByYear::new();
        };

        years
            .iter()
            .map(|(year, entries)| {
                let references = entries
                    .iter()
                    .filter_map(|entry| {
                        let reference = DocumentReference::from_url(&entry.url, Some(brand))
                            .with_dealer_id(dealer_id);
                        // The URL decides the date; a disagreeing label means a bad entry.
                        match &entry.date {
                            Some(date) if *date != reference.date => {
                                warn!(url = %entry.url, date, "index date does not match document URL; skipping");
                                None
                            }
                            _ => Some(reference),
                        }
                    })
                    .collect();
                (year.clone(), references)
            })
            .collect()
    }
}

#[allow(clippy::expect_used)]
static DATE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}\s+\w+\s+\d{4}$").expect("static date label pattern is valid"));

/// Converts a picker label such as `"14 October 2024"` to `"2024-10-14"`.
#[must_use]
pub fn parse_listing_date(label: &str) -> Option<String> {
    NaiveDate::parse_from_str(label.trim(), "%d %B %Y")
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Whether picker text looks like a date entry (`DD Month YYYY`).
#[must_use]
pub fn is_date_label(text: &str) -> bool {
    DATE_LABEL.is_match(text.trim())
}

/// Whether picker text is a year entry: four digits starting with `20`.
#[must_use]
pub fn is_year_label(text: &str) -> bool {
    let text = text.trim();
    text.len() == 4 && text.starts_with("20") && text.bytes().all(|b| b.is_ascii_digit())
}

/// Builds document references from date picker labels.
///
/// Labels that do not parse are skipped with a warning. Duplicates collapse,
/// and the result is ordered newest first.
#[must_use]
pub fn references_for_dates<'a>(
    site: &Site,
    dealer_id: &str,
    brand: &str,
    labels: impl IntoIterator<Item = &'a str>,
) -> Vec<DocumentReference> {
    let dates: BTreeSet<String> = labels
        .into_iter()
        .filter_map(|label| {
            let parsed = parse_listing_date(label);
            if parsed.is_none() {
                warn!(label, "unrecognised date label");
            }
            parsed
        })
        .collect();

    dates
        .into_iter()
        .rev()
        .map(|date| {
            DocumentReference::from_url(site.document_url(dealer_id, &date), Some(brand))
                .with_dealer_id(dealer_id)
        })
        .collect()
}

/// Groups references by the year directory their date falls into.
#[must_use]
pub fn group_by_year(references: Vec<DocumentReference>) -> DocumentsByYear {
    let mut grouped = DocumentsByYear::new();
    for reference in references {
        let year = crate::download::placement::year_of(&reference.date).to_string();
        grouped.entry(year).or_default().push(reference);
    }
    grouped
}

//! Dealer to brand mapping file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::listing::normalize_brand;

/// Errors loading the mapping file. Both are fatal at startup.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The file could not be read.
    #[error("failed to read dealer mapping {path}: {source}")]
    Read {
        /// File that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a JSON object of string to string.
    #[error("malformed dealer mapping {path}: {source}")]
    Parse {
        /// File that failed.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Dealer id to human-cased brand name, ordered by dealer id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DealerBrandMapping {
    dealers: BTreeMap<String, String>,
}

impl DealerBrandMapping {
    /// Reads a mapping from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Read`] when the file is missing or unreadable,
    /// and [`MappingError::Parse`] when it is not a JSON object of strings.
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let text = std::fs::read_to_string(path).map_err(|source| MappingError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| MappingError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Number of dealers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dealers.len()
    }

    /// Whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dealers.is_empty()
    }

    /// Brand for a dealer id.
    #[must_use]
    pub fn brand_of(&self, dealer_id: &str) -> Option<&str> {
        self.dealers.get(dealer_id).map(String::as_str)
    }

    /// All `(dealer_id, brand)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dealers.iter().map(|(d, b)| (d.as_str(), b.as_str()))
    }

    /// Dealers whose brand matches `brand` after normalization on both sides.
    #[must_use]
    pub fn for_brand(&self, brand: &str) -> Vec<(&str, &str)> {
        let wanted = normalize_brand(brand);
        self.iter()
            .filter(|(_, b)| normalize_brand(b) == wanted)
            .collect()
    }

    /// Keeps only the listed dealer ids. An empty list keeps everything.
    #[must_use]
    pub fn restricted_to(&self, dealer_ids: &[String]) -> Self {
        if dealer_ids.is_empty() {
            return self.clone();
        }
        Self {
            dealers: self
                .dealers
                .iter()
                .filter(|(id, _)| dealer_ids.contains(id))
                .map(|(id, brand)| (id.clone(), brand.clone()))
                .collect(),
        }
    }

    /// Distinct brand names, sorted.
    #[must_use]
    pub fn brands(&self) -> Vec<&str> {
        self.dealers
            .values()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl FromIterator<(String, String)> for DealerBrandMapping {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            dealers: iter.into_iter().collect(),
        }
    }
}

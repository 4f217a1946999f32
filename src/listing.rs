//! Listing page scraping and URL metadata extraction.
//!
//! Everything here is pure: HTML text or URL strings in, plain values out.

use scraper::{Html, Selector};
use tracing::debug;

/// CSS class of the element wrapping the list of price-list links.
pub const PRICELIST_CONTAINER_CLASS: &str = "styles_containerDatesContent__nOueF";

/// CSS class carried by each price-list anchor.
pub const PRICELIST_LINK_CLASS: &str = "styles_textPricelistLink__UvFUj";

const DOCUMENT_SUFFIX: &str = ".pdf";

/// Markers used to locate document links inside a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingMarkers {
    /// Class of the container `div`; only the first match is inspected.
    pub container_class: String,
    /// Class of the anchors inside the container.
    pub link_class: String,
}

impl Default for ListingMarkers {
    fn default() -> Self {
        Self {
            container_class: PRICELIST_CONTAINER_CLASS.to_string(),
            link_class: PRICELIST_LINK_CLASS.to_string(),
        }
    }
}

/// Metadata derived from a document URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Last path segment without the `.pdf` suffix.
    pub filename: String,
    /// Segment following `pricelist`, when present.
    pub dealer_id: Option<String>,
    /// Publication label; always equal to `filename`.
    pub date: String,
}

/// Extracts document links from a listing page using the default markers.
///
/// Returns hrefs in document order. Missing or malformed markup yields an
/// empty list.
#[must_use]
pub fn scrape_listing_links(html: &str) -> Vec<String> {
    scrape_listing_links_with(html, &ListingMarkers::default())
}

/// Extracts document links from a listing page using explicit markers.
#[must_use]
pub fn scrape_listing_links_with(html: &str, markers: &ListingMarkers) -> Vec<String> {
    let Ok(container_selector) = Selector::parse(&format!("div.{}", markers.container_class))
    else {
        debug!(class = %markers.container_class, "invalid container selector");
        return Vec::new();
    };
    let Ok(link_selector) = Selector::parse(&format!("a.{}", markers.link_class)) else {
        debug!(class = %markers.link_class, "invalid link selector");
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let Some(container) = document.select(&container_selector).next() else {
        debug!("listing container not found");
        return Vec::new();
    };

    container
        .select(&link_selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| href.ends_with(DOCUMENT_SUFFIX))
        .map(str::to_string)
        .collect()
}

/// Derives filename, dealer id and date from a document URL.
///
/// ```
/// use pricelist_core::listing::extract_metadata;
///
/// let meta = extract_metadata("https://host/new_cars/pricelist/82/2025-01-15.pdf");
/// assert_eq!(meta.dealer_id.as_deref(), Some("82"));
/// assert_eq!(meta.date, "2025-01-15");
/// ```
#[must_use]
pub fn extract_metadata(document_url: &str) -> DocumentMetadata {
    let parts: Vec<&str> = document_url.trim_end_matches('/').split('/').collect();
    let last = parts.last().copied().unwrap_or_default();
    let filename = last.strip_suffix(DOCUMENT_SUFFIX).unwrap_or(last).to_string();

    let dealer_id = parts
        .iter()
        .position(|segment| *segment == "pricelist")
        .and_then(|index| parts.get(index + 1))
        .map(|segment| (*segment).to_string());

    DocumentMetadata {
        date: filename.clone(),
        filename,
        dealer_id,
    }
}

/// Derives the brand segment from a listing page URL.
///
/// The brand is the segment two positions after `pricelists`
/// (`/new-cars/pricelists/{dealer}/{brand}`).
#[must_use]
pub fn extract_brand(listing_url: &str) -> Option<String> {
    let parts: Vec<&str> = listing_url.trim_end_matches('/').split('/').collect();
    let index = parts.iter().position(|segment| *segment == "pricelists")?;
    parts.get(index + 2).map(|segment| (*segment).to_string())
}

/// Normalizes a brand name for use in URLs and directory names.
///
/// Lowercases, then maps each space and underscore to a hyphen. Runs are not
/// collapsed: `"Land  Rover"` becomes `land--rover`.
#[must_use]
pub fn normalize_brand(name: &str) -> String {
    name.to_lowercase().replace([' ', '_'], "-")
}

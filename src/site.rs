//! URL layout of the price-list site.
//!
//! The site exposes two kinds of resources that this crate ever requests:
//!
//! - listing pages: `/new-cars/pricelists/{dealer_id}/{brand}`
//! - documents: `/new_cars/pricelist/{dealer_id}/{date}.pdf`
//!
//! [`Site`] builds both from a configurable base URL so the same code can be
//! pointed at a local mock server.

use crate::listing::normalize_brand;

/// Base URL of the production site.
pub const DEFAULT_BASE_URL: &str = "https://www.sgcarmart.com";

/// Path prefix of dealer listing pages.
pub const LISTING_PATH_PREFIX: &str = "/new-cars/pricelists";

/// Path prefix of price-list documents.
pub const DOCUMENT_PATH_PREFIX: &str = "/new_cars/pricelist";

/// A price-list site rooted at a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    base_url: String,
}

impl Default for Site {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Site {
    /// Creates a site rooted at `base_url`. A trailing slash is ignored.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the listing page URL for a dealer/brand pair.
    ///
    /// The brand is normalized (`"Alfa Romeo"` becomes `alfa-romeo`).
    #[must_use]
    pub fn listing_url(&self, dealer_id: &str, brand: &str) -> String {
        format!(
            "{}{LISTING_PATH_PREFIX}/{dealer_id}/{}",
            self.base_url,
            normalize_brand(brand)
        )
    }

    /// Returns the document URL for a dealer and publication date label.
    #[must_use]
    pub fn document_url(&self, dealer_id: &str, date: &str) -> String {
        format!("{}{DOCUMENT_PATH_PREFIX}/{dealer_id}/{date}.pdf", self.base_url)
    }

    /// Resolves a link scraped from a listing page to an absolute URL.
    ///
    /// Links already starting with `http` are returned unchanged; anything else
    /// is treated as site-relative.
    #[must_use]
    pub fn resolve(&self, link: &str) -> String {
        if link.starts_with("http") {
            link.to_string()
        } else if link.starts_with('/') {
            format!("{}{link}", self.base_url)
        } else {
            format!("{}/{link}", self.base_url)
        }
    }

    /// Returns `host[:port]` of the base URL, if it parses.
    #[must_use]
    pub fn authority(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.base_url).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        Some(match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url_normalizes_brand() {
        let site = Site::default();
        assert_eq!(
            site.listing_url("12", "Alfa Romeo"),
            "https://www.sgcarmart.com/new-cars/pricelists/12/alfa-romeo"
        );
    }

    #[test]
    fn test_document_url_layout() {
        let site = Site::new("http://127.0.0.1:8080/");
        assert_eq!(
            site.document_url("82", "2025-01-15"),
            "http://127.0.0.1:8080/new_cars/pricelist/82/2025-01-15.pdf"
        );
    }

    #[test]
    fn test_resolve_relative_and_absolute_links() {
        let site = Site::default();
        assert_eq!(
            site.resolve("/new_cars/pricelist/82/2025-01-15.pdf"),
            "https://www.sgcarmart.com/new_cars/pricelist/82/2025-01-15.pdf"
        );
        assert_eq!(
            site.resolve("new_cars/pricelist/82/2025-01-15.pdf"),
            "https://www.sgcarmart.com/new_cars/pricelist/82/2025-01-15.pdf"
        );
        assert_eq!(
            site.resolve("https://cdn.example.com/a.pdf"),
            "https://cdn.example.com/a.pdf"
        );
    }

    #[test]
    fn test_authority_includes_port_only_when_present() {
        assert_eq!(
            Site::default().authority().unwrap(),
            "www.sgcarmart.com"
        );
        assert_eq!(
            Site::new("http://127.0.0.1:4000").authority().unwrap(),
            "127.0.0.1:4000"
        );
        assert!(Site::new("not a url").authority().is_none());
    }
}

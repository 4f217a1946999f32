//! Local gate applied to every URL before any network I/O.

use std::sync::LazyLock;

use regex::RegexSet;
use tracing::warn;

use super::error::DownloadError;
use super::robots::RobotsRules;
use crate::site::Site;

/// Paths this crate is permitted to request: listing pages and documents.
#[allow(clippy::expect_used)]
static ALLOWED_PATHS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^/new-cars/pricelists/[^/]+/[^/]+/?$",
        r"^/new_cars/pricelist/[^/]+/[^/]+\.pdf$",
    ])
    .expect("static crawl path patterns are valid")
});

/// Host, path and robots.txt restrictions for one site.
#[derive(Debug, Clone)]
pub struct CrawlPolicy {
    authority: Option<String>,
    robots: RobotsRules,
}

impl CrawlPolicy {
    /// Restricts requests to `site`'s host and the two known path shapes.
    #[must_use]
    pub fn for_site(site: &Site) -> Self {
        let authority = site.authority();
        if authority.is_none() {
            warn!(base = %site.base_url(), "site base URL does not parse; every request will be refused");
        }
        Self {
            authority,
            robots: RobotsRules::default(),
        }
    }

    /// Adds robots.txt `Disallow` prefixes.
    #[must_use]
    pub fn with_robots(mut self, robots: RobotsRules) -> Self {
        self.robots = robots;
        self
    }

    /// Checks `url` against the policy.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidUrl`] if `url` does not parse
    /// - [`DownloadError::Disallowed`] for a foreign host, an unknown path
    ///   shape or a robots.txt exclusion
    pub fn check(&self, url: &str) -> Result<(), DownloadError> {
        let parsed = url::Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let host = parsed.host_str().map(str::to_lowercase);
        let authority = match (host, parsed.port()) {
            (Some(host), Some(port)) => Some(format!("{host}:{port}")),
            (host, None) => host,
            (None, Some(_)) => None,
        };
        if authority.is_none() || authority != self.authority {
            return Err(DownloadError::disallowed(
                url,
                format!(
                    "host {} is not the configured site",
                    authority.as_deref().unwrap_or("<none>")
                ),
            ));
        }

        let path = parsed.path();
        if !ALLOWED_PATHS.is_match(path) {
            return Err(DownloadError::disallowed(
                url,
                format!("path {path} is not a listing page or price-list document"),
            ));
        }

        if let Some(prefix) = self.robots.disallows(path) {
            return Err(DownloadError::disallowed(
                url,
                format!("robots.txt disallows {prefix}"),
            ));
        }

        Ok(())
    }
}

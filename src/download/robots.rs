//! Minimal robots.txt fetching and parsing.
//!
//! Only the `User-agent: *` group is read, and only its `Disallow` and
//! `Crawl-delay` lines.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::constants::PAGE_TIMEOUT;
use super::error::DownloadError;
use crate::site::Site;

/// Rules published for all user agents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    /// Disallowed path prefixes, longest first.
    pub disallowed: Vec<String>,
    /// Published minimum spacing between requests.
    pub crawl_delay: Option<Duration>,
}

impl RobotsRules {
    /// Returns whether `path` falls under a disallowed prefix.
    #[must_use]
    pub fn disallows(&self, path: &str) -> Option<&str> {
        self.disallowed
            .iter()
            .find(|prefix| path.starts_with(prefix.as_str()))
            .map(String::as_str)
    }
}

/// Errors from robots.txt retrieval.
#[derive(Debug, thiserror::Error)]
pub enum RobotsError {
    /// The site base URL does not parse.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
    /// robots.txt could not be fetched.
    #[error("failed to fetch robots.txt: {0}")]
    Fetch(#[source] DownloadError),
}

/// Fetches `{base}/robots.txt` and parses it. A 404 yields empty rules.
///
/// # Errors
///
/// Returns [`RobotsError`] if the base URL is invalid or the fetch fails with
/// anything other than 404.
#[instrument(skip(client), fields(base = %site.base_url()))]
pub async fn fetch_robots_rules(client: &HttpClient, site: &Site) -> Result<RobotsRules, RobotsError> {
    if site.authority().is_none() {
        return Err(RobotsError::InvalidUrl(site.base_url().to_string()));
    }
    let robots_url = format!("{}/robots.txt", site.base_url());

    match client.get(&robots_url, PAGE_TIMEOUT).await {
        Ok(response) => {
            let rules = parse_robots(&response.text());
            info!(
                disallowed = rules.disallowed.len(),
                crawl_delay_secs = rules.crawl_delay.map(|d| d.as_secs_f64()),
                "loaded robots.txt"
            );
            Ok(rules)
        }
        Err(DownloadError::HttpStatus { status: 404, .. }) => {
            debug!("no robots.txt published");
            Ok(RobotsRules::default())
        }
        Err(error) => Err(RobotsError::Fetch(error)),
    }
}

/// Parses a robots.txt body.
///
/// Directive names are matched case-insensitively. An empty `Disallow` value
/// allows everything and is ignored.
#[must_use]
pub fn parse_robots(body: &str) -> RobotsRules {
    let mut in_star = false;
    let mut rules = RobotsRules::default();

    for line in body.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => in_star = value == "*",
            "disallow" if in_star => {
                let prefix = normalize_disallow_path(value);
                if !prefix.is_empty() && !rules.disallowed.contains(&prefix) {
                    rules.disallowed.push(prefix);
                }
            }
            "crawl-delay" if in_star => {
                match value.parse::<f64>().map(Duration::try_from_secs_f64) {
                    Ok(Ok(delay)) => rules.crawl_delay = Some(delay),
                    _ => warn!(value, "ignoring unusable crawl-delay"),
                }
            }
            _ => {}
        }
    }

    rules.disallowed.sort_by_key(|b| std::cmp::Reverse(b.len()));
    rules
}

fn normalize_disallow_path(path: &str) -> String {
    let s = path.trim();
    if s.is_empty() {
        return String::new();
    }
    if s.starts_with('/') {
        s.to_string()
    } else {
        format!("/{s}")
    }
}

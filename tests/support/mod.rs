//! Shared fixtures for integration tests: mock site, transports, payloads.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pricelist_core::download::{
    CrawlPolicy, DocumentDownloader, FetchTimeouts, HttpClient, RateLimiter, RetryPolicy,
    Transport,
};
use pricelist_core::listing::{PRICELIST_CONTAINER_CLASS, PRICELIST_LINK_CLASS};
use pricelist_core::site::Site;
use pricelist_core::user_agent::FixedUserAgent;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// User-Agent sent by every test transport.
pub const TEST_USER_AGENT: &str = "pricelists-test/1.0";

/// A syntactically plausible PDF payload above the minimum size.
pub fn pdf_bytes() -> Vec<u8> {
    let mut body = b"%PDF-1.7\n".to_vec();
    body.extend(std::iter::repeat_n(b'x', 2048));
    body.extend_from_slice(b"\n%%EOF\n");
    body
}

/// Listing page with the given hrefs inside the price-list container.
pub fn listing_html(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a class="{PRICELIST_LINK_CLASS}" href="{href}">{href}</a>"#))
        .collect();
    format!(
        r#"<html><body><div class="header"><a href="/elsewhere.pdf">x</a></div>
<div class="{PRICELIST_CONTAINER_CLASS}">{anchors}</div></body></html>"#
    )
}

/// Site pointed at the mock server.
pub fn site_for(server: &MockServer) -> Site {
    Site::new(server.uri())
}

/// Retry policy with millisecond delays.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::with_max_attempts(max_attempts)
        .with_delays(Duration::from_millis(5), Duration::from_millis(20))
}

/// Transport for `site` with no crawl delay and fast retries.
pub fn transport_for(site: &Site, max_attempts: u32) -> Transport {
    transport_with_limiter(site, max_attempts, Arc::new(RateLimiter::disabled()))
}

/// Transport for `site` with an explicit limiter.
pub fn transport_with_limiter(
    site: &Site,
    max_attempts: u32,
    limiter: Arc<RateLimiter>,
) -> Transport {
    Transport::new(
        HttpClient::new(Arc::new(FixedUserAgent(TEST_USER_AGENT.to_string()))),
        fast_retry(max_attempts),
        limiter,
        CrawlPolicy::for_site(site),
    )
    .with_timeouts(FetchTimeouts {
        page: Duration::from_secs(2),
        document: Duration::from_secs(2),
    })
}

/// Downloader writing into a fresh temp dir. Keep the `TempDir` alive.
pub fn downloader_for(site: &Site, max_attempts: u32) -> (TempDir, DocumentDownloader) {
    let dir = TempDir::new().expect("create temp dir");
    let downloader = DocumentDownloader::new(transport_for(site, max_attempts), dir.path());
    (dir, downloader)
}

/// Serves a valid PDF at `doc_path`.
pub async fn mount_pdf(server: &MockServer, doc_path: &str) {
    Mock::given(method("GET"))
        .and(path(doc_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(pdf_bytes()),
        )
        .mount(server)
        .await;
}

/// Serves a listing page at `page_path` linking to `hrefs`.
pub async fn mount_listing(server: &MockServer, page_path: &str, hrefs: &[&str]) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(listing_html(hrefs)),
        )
        .mount(server)
        .await;
}

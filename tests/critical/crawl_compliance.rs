//! P0: only the site's listing and document paths are ever requested.

use std::sync::Arc;
use std::time::Duration;

use pricelist_core::download::{
    CrawlPolicy, DocumentDownloader, HttpClient, RateLimiter, Transport, fetch_robots_rules,
};
use pricelist_core::outcome::{DocumentReference, DownloadStatus};
use pricelist_core::user_agent::FixedUserAgent;
use pricelist_core::{DownloadEngine, Site};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{
    TEST_USER_AGENT, downloader_for, fast_retry, mount_listing, mount_pdf, pdf_bytes, site_for,
};

fn client() -> HttpClient {
    HttpClient::new(Arc::new(FixedUserAgent(TEST_USER_AGENT.to_string())))
}

#[tokio::test]
async fn p0_unknown_path_on_site_is_never_requested() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    Mock::given(method("GET"))
        .and(path("/admin/export.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_bytes()))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, downloader) = downloader_for(&site, 3);
    let doc = DocumentReference::from_url(format!("{}/admin/export.pdf", server.uri()), Some("MG"));

    let outcome = downloader.download(&doc).await;
    assert_eq!(outcome.status, DownloadStatus::Error);
    assert!(outcome.message.contains("not a listing page or price-list document"));
}

#[tokio::test]
async fn p0_foreign_link_on_listing_page_is_refused() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    mount_listing(
        &server,
        "/new-cars/pricelists/82/mg",
        &[
            "https://mirror.example.invalid/new_cars/pricelist/82/2025-01-01.pdf",
            "/new_cars/pricelist/82/2025-02-01.pdf",
        ],
    )
    .await;
    mount_pdf(&server, "/new_cars/pricelist/82/2025-02-01.pdf").await;

    let (_dir, downloader) = downloader_for(&site, 1);
    let engine = DownloadEngine::new(2, downloader, site.clone()).expect("engine");

    let outcomes = engine
        .download_all_from_listing(&site.listing_url("82", "MG"), None)
        .await;
    assert_eq!(outcomes.len(), 2);
    let foreign = outcomes
        .iter()
        .find(|o| o.document.url.contains("mirror.example.invalid"))
        .expect("foreign outcome");
    assert_eq!(foreign.status, DownloadStatus::Error);
    assert!(foreign.message.starts_with("refusing to fetch"));
}

#[tokio::test]
async fn p0_robots_disallow_and_crawl_delay_are_loaded() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "User-agent: Googlebot\nDisallow: /\n\nUser-agent: *\nDisallow: /new_cars/pricelist/99/\nCrawl-delay: 2\n",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new_cars/pricelist/99/2025-01-01.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_bytes()))
        .expect(0)
        .mount(&server)
        .await;
    mount_pdf(&server, "/new_cars/pricelist/82/2025-01-01.pdf").await;

    let rules = fetch_robots_rules(&client(), &site).await.expect("robots");
    assert_eq!(rules.crawl_delay, Some(Duration::from_secs(2)));
    assert_eq!(rules.disallowed, vec!["/new_cars/pricelist/99/".to_string()]);

    let dir = TempDir::new().expect("temp dir");
    let transport = Transport::new(
        client(),
        fast_retry(1),
        Arc::new(RateLimiter::disabled()),
        CrawlPolicy::for_site(&site).with_robots(rules),
    );
    let downloader = DocumentDownloader::new(transport, dir.path());

    let blocked = downloader
        .download(&DocumentReference::from_url(site.document_url("99", "2025-01-01"), Some("MG")))
        .await;
    assert_eq!(blocked.status, DownloadStatus::Error);
    assert!(blocked.message.contains("robots.txt disallows"), "{}", blocked.message);

    let allowed = downloader
        .download(&DocumentReference::from_url(site.document_url("82", "2025-01-01"), Some("MG")))
        .await;
    assert_eq!(allowed.status, DownloadStatus::Success);
}

#[tokio::test]
async fn p0_missing_robots_means_no_extra_rules() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let rules = fetch_robots_rules(&client(), &site).await.expect("robots");
    assert!(rules.disallowed.is_empty());
    assert!(rules.crawl_delay.is_none());
}

#[tokio::test]
async fn p0_invalid_base_url_refuses_everything() {
    let site = Site::new("not a url");
    let (_dir, downloader) = downloader_for(&site, 1);
    let doc = DocumentReference::from_url(
        "https://www.sgcarmart.com/new_cars/pricelist/82/2025-01-01.pdf",
        Some("MG"),
    );
    let outcome = downloader.download(&doc).await;
    assert_eq!(outcome.status, DownloadStatus::Error);
}

//! P0: 429 handling and crawl-delay spacing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pricelist_core::download::{DocumentDownloader, RateLimiter};
use pricelist_core::outcome::{DocumentReference, DownloadStatus};
use pricelist_core::DownloadEngine;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{downloader_for, mount_pdf, pdf_bytes, site_for, transport_with_limiter};

#[tokio::test]
async fn p0_429_then_200_retries_and_succeeds() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    let doc_path = "/new_cars/pricelist/82/2025-01-15.pdf";

    Mock::given(method("GET"))
        .and(path(doc_path))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(doc_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(pdf_bytes()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, downloader) = downloader_for(&site, 3);
    let doc = DocumentReference::from_url(site.document_url("82", "2025-01-15"), Some("MG"));

    let outcome = downloader.download(&doc).await;
    assert_eq!(outcome.status, DownloadStatus::Success, "{}", outcome.message);
}

#[tokio::test]
async fn p0_single_attempt_policy_does_not_retry_429() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    Mock::given(method("GET"))
        .and(path("/new_cars/pricelist/82/2025-01-15.pdf"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, downloader) = downloader_for(&site, 1);
    let doc = DocumentReference::from_url(site.document_url("82", "2025-01-15"), Some("MG"));

    let outcome = downloader.download(&doc).await;
    assert_eq!(outcome.status, DownloadStatus::Error);
    assert_eq!(outcome.message, "429 Too Many Requests after 1 attempts");
}

#[tokio::test]
async fn p0_crawl_delay_spaces_requests_across_the_pool() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    for date in ["2025-01-01", "2025-02-01", "2025-03-01"] {
        mount_pdf(&server, &format!("/new_cars/pricelist/82/{date}.pdf")).await;
    }

    let delay = Duration::from_millis(150);
    let dir = TempDir::new().expect("temp dir");
    let transport = transport_with_limiter(&site, 1, Arc::new(RateLimiter::new(delay)));
    let downloader = DocumentDownloader::new(transport, dir.path());
    let engine = DownloadEngine::new(5, downloader, site.clone()).expect("engine");

    let references = ["2025-01-01", "2025-02-01", "2025-03-01"]
        .into_iter()
        .map(|date| DocumentReference::from_url(site.document_url("82", date), Some("MG")))
        .collect();

    let started = Instant::now();
    let outcomes = engine.download_references(references).await;
    let elapsed = started.elapsed();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.status == DownloadStatus::Success));
    assert!(
        elapsed >= delay * 2,
        "three request starts need at least two delays, took {elapsed:?}"
    );
}

#[tokio::test]
async fn p0_retries_also_wait_for_crawl_delay() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    Mock::given(method("GET"))
        .and(path("/new_cars/pricelist/82/2025-01-15.pdf"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let delay = Duration::from_millis(100);
    let dir = TempDir::new().expect("temp dir");
    let transport = transport_with_limiter(&site, 3, Arc::new(RateLimiter::new(delay)));
    let downloader = DocumentDownloader::new(transport, dir.path());
    let doc = DocumentReference::from_url(site.document_url("82", "2025-01-15"), Some("MG"));

    let started = Instant::now();
    let outcome = downloader.download(&doc).await;
    assert_eq!(outcome.status, DownloadStatus::Error);
    assert!(started.elapsed() >= delay * 2);
}

#[tokio::test]
async fn p0_rate_limited_document_does_not_affect_siblings() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    Mock::given(method("GET"))
        .and(path("/new_cars/pricelist/82/2025-01-01.pdf"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    mount_pdf(&server, "/new_cars/pricelist/82/2025-02-01.pdf").await;

    let (_dir, downloader) = downloader_for(&site, 2);
    let engine = DownloadEngine::new(2, downloader, site.clone()).expect("engine");
    let references = vec![
        DocumentReference::from_url(site.document_url("82", "2025-01-01"), Some("MG")),
        DocumentReference::from_url(site.document_url("82", "2025-02-01"), Some("MG")),
    ];

    let outcomes = engine.download_references(references).await;
    assert_eq!(outcomes.len(), 2);
    let limited = outcomes
        .iter()
        .find(|o| o.document.date == "2025-01-01")
        .expect("outcome for rate-limited document");
    assert_eq!(limited.status, DownloadStatus::Error);
    assert_eq!(limited.message, "429 Too Many Requests after 2 attempts");
    assert!(
        outcomes
            .iter()
            .any(|o| o.document.date == "2025-02-01" && o.status == DownloadStatus::Success)
    );
}

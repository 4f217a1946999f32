//! P0: concurrent duplicate downloads never expose partial files.

use pricelist_core::DownloadEngine;
use pricelist_core::outcome::{DocumentReference, DownloadStatus};

use crate::support::{downloader_for, mount_pdf, pdf_bytes, site_for};
use wiremock::MockServer;

fn leftover_temp_files(dir: &std::path::Path) -> Vec<String> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current).expect("read dir") {
            let entry = entry.expect("dir entry");
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "part") {
                found.push(path.display().to_string());
            }
        }
    }
    found
}

#[tokio::test]
async fn p0_duplicate_references_in_one_batch_leave_one_complete_file() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    mount_pdf(&server, "/new_cars/pricelist/82/2025-01-15.pdf").await;

    let (dir, downloader) = downloader_for(&site, 1);
    let engine = DownloadEngine::new(8, downloader, site.clone()).expect("engine");
    let reference = DocumentReference::from_url(site.document_url("82", "2025-01-15"), Some("MG"));

    let outcomes = engine.download_references(vec![reference; 8]).await;

    assert_eq!(outcomes.len(), 8);
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o.status, DownloadStatus::Success | DownloadStatus::Skipped)),
        "{outcomes:?}"
    );
    let target = dir.path().join("mg/2025/dealer_82_2025-01-15.pdf");
    assert_eq!(std::fs::read(&target).expect("read target"), pdf_bytes());
    assert!(leftover_temp_files(dir.path()).is_empty());
}

#[tokio::test]
async fn p0_parallel_distinct_documents_land_in_their_own_paths() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    let dealers = ["1", "2", "3", "4", "5", "6"];
    for dealer in dealers {
        mount_pdf(&server, &format!("/new_cars/pricelist/{dealer}/2024-12-31.pdf")).await;
    }

    let (dir, downloader) = downloader_for(&site, 1);
    let engine = DownloadEngine::new(6, downloader, site.clone()).expect("engine");
    let references = dealers
        .iter()
        .map(|dealer| {
            DocumentReference::from_url(site.document_url(dealer, "2024-12-31"), Some("Land Rover"))
        })
        .collect();

    let outcomes = engine.download_references(references).await;
    assert!(outcomes.iter().all(|o| o.status == DownloadStatus::Success));
    for dealer in dealers {
        let path = dir
            .path()
            .join(format!("land-rover/2024/dealer_{dealer}_2024-12-31.pdf"));
        assert!(path.is_file(), "missing {}", path.display());
    }
    assert!(leftover_temp_files(dir.path()).is_empty());
}

//! Where documents land on disk, and how they get there.
//!
//! Layout under the output root:
//!
//! - brand and dealer known: `{brand}/{year}/dealer_{dealer_id}_{date}.pdf`
//! - brand only: `{brand}/{year}/{date}.pdf`
//! - no brand: `{last URL segment}`
//!
//! Presence of a file at the computed path is the only deduplication signal.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::error::DownloadError;
use crate::listing::normalize_brand;
use crate::outcome::DocumentReference;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Year directory for a date label.
///
/// The part before the first `-` when one is present, otherwise the first
/// four characters.
#[must_use]
pub fn year_of(date: &str) -> &str {
    match date.split_once('-') {
        Some((year, _)) => year,
        None => date
            .char_indices()
            .nth(4)
            .map_or(date, |(index, _)| &date[..index]),
    }
}

/// Computes the target path for a document under `root`.
#[must_use]
pub fn target_path(root: &Path, document: &DocumentReference) -> PathBuf {
    let Some(brand) = document.brand.as_deref() else {
        let last = document
            .url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        return root.join(sanitize_component(last));
    };

    let file_name = match &document.dealer_id {
        Some(dealer_id) => format!("dealer_{dealer_id}_{}.pdf", document.date),
        None => format!("{}.pdf", document.date),
    };

    root.join(sanitize_component(&normalize_brand(brand)))
        .join(sanitize_component(year_of(&document.date)))
        .join(sanitize_component(&file_name))
}

/// Writes `bytes` to `path` so readers never observe a partial file.
///
/// Missing parent directories are created. Bytes go to a uniquely named
/// sibling which is then renamed over `path`; the sibling is removed if any
/// step fails.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] naming the path that failed.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| DownloadError::io(parent, e))?;

    let temp = temp_sibling(path);
    if let Err(e) = tokio::fs::write(&temp, bytes).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(DownloadError::io(&temp, e));
    }
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(DownloadError::io(path, e));
    }

    debug!(path = %path.display(), bytes = bytes.len(), "document stored");
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}.{seq}.part", std::process::id()))
}

/// Replaces characters invalid on common filesystems and neutralizes
/// `.`/`..` so a component can never leave its parent directory.
fn sanitize_component(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    let escapes = Path::new(&sanitized).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        sanitized.replace('.', "_")
    } else {
        sanitized
    }
}

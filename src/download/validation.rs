//! Acceptance checks for fetched documents.

use thiserror::Error;

use super::constants::{MIN_DOCUMENT_SIZE, PDF_CONTENT_TYPE, PDF_MAGIC};

/// Reason a fetched payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    /// A `Content-Type` header was present and did not name a PDF.
    #[error("Not a PDF file (content-type: {0})")]
    WrongContentType(String),
    /// Payload shorter than the minimum size.
    #[error("File too small ({0} bytes)")]
    TooSmall(usize),
    /// Payload does not start with `%PDF`.
    #[error("Invalid PDF header")]
    InvalidHeader,
}

/// Checks a payload in order: content type, size, magic header.
///
/// A missing or empty content type passes the first check. The content-type
/// match is a case-insensitive substring test, so parameters such as
/// `; charset=binary` are tolerated.
///
/// # Errors
///
/// Returns the first check that failed.
pub fn validate_pdf(content: &[u8], content_type: Option<&str>) -> Result<(), ValidationFailure> {
    if let Some(content_type) = content_type.filter(|ct| !ct.is_empty()) {
        if !content_type
            .to_ascii_lowercase()
            .contains(PDF_CONTENT_TYPE)
        {
            return Err(ValidationFailure::WrongContentType(content_type.to_string()));
        }
    }

    if content.len() < MIN_DOCUMENT_SIZE {
        return Err(ValidationFailure::TooSmall(content.len()));
    }

    if !content.starts_with(PDF_MAGIC) {
        return Err(ValidationFailure::InvalidHeader);
    }

    Ok(())
}

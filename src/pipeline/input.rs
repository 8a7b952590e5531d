//! Document input: read the bytes of a local PDF.
//!
//! The whole file is read into memory because the bytes serve twice: as the
//! content identifier's input and as the payload of the OCR call. Failures
//! are classified into the input errors of [`ClassifyError`] so the error
//! record names the actual problem.

use crate::error::ClassifyError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Read and sanity-check a PDF file.
pub async fn read_document(path: &Path) -> Result<Vec<u8>, ClassifyError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ClassifyError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => ClassifyError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ClassifyError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    if bytes.is_empty() {
        return Err(ClassifyError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }

    if !bytes.starts_with(PDF_MAGIC) {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(ClassifyError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

/// `true` when the path has a `.pdf` extension (any case).
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

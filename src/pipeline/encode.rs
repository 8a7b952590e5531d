//! Image encoding: rendered page → base64 PNG `ImageData`.
//!
//! PNG keeps scanned text crisp; `detail: "high"` lets GPT-class models
//! tile the image so small print (NIF, IBAN, references) stays legible.

use crate::error::ClassifyError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode one page.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(ImageData::new(STANDARD.encode(&buf), "image/png").with_detail("high"))
}

/// Encode every page of a document, in order.
pub fn encode_pages(name: &str, pages: &[DynamicImage]) -> Result<Vec<ImageData>, ClassifyError> {
    let encoded = pages
        .iter()
        .enumerate()
        .map(|(idx, img)| {
            encode_page(img).map_err(|e| ClassifyError::RasterisationFailed {
                page: idx + 1,
                detail: format!("PNG encoding failed: {e}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "{}: encoded {} page(s), {} bytes base64",
        name,
        encoded.len(),
        encoded.iter().map(|i| i.data.len()).sum::<usize>()
    );
    Ok(encoded)
}

//! PDF rasterisation for the OCR call.
//!
//! Providers accept page images, not PDF files, so the document bytes are
//! rendered page by page with pdfium before they are attached. Rendering
//! runs in `spawn_blocking`: pdfium is synchronous and CPU-bound.
//!
//! ## Library binding
//!
//! pdfium is a native library loaded at runtime, looked up in order:
//! `PDFIUM_LIB_PATH` (file or directory), the working directory, then the
//! system library path.

use crate::error::ClassifyError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rendering knobs, copied out of the classifier config.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    pub max_pages: usize,
    pub password: Option<String>,
}

/// Rasterise up to `max_pages` pages of an in-memory PDF.
pub async fn render_document(
    name: &str,
    bytes: Arc<Vec<u8>>,
    options: &RenderOptions,
) -> Result<Vec<DynamicImage>, ClassifyError> {
    let name = name.to_string();
    let options = options.clone();

    tokio::task::spawn_blocking(move || render_blocking(&name, &bytes, &options))
        .await
        .map_err(|e| ClassifyError::Internal(format!("Render task panicked: {e}")))?
}

fn render_blocking(
    name: &str,
    bytes: &[u8],
    options: &RenderOptions,
) -> Result<Vec<DynamicImage>, ClassifyError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, options.password.as_deref())
        .map_err(|e| {
            let detail = format!("{e:?}");
            if detail.to_lowercase().contains("password") {
                ClassifyError::PasswordRequired {
                    name: name.to_string(),
                }
            } else {
                ClassifyError::CorruptPdf {
                    name: name.to_string(),
                    detail,
                }
            }
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    if total == 0 {
        return Err(ClassifyError::CorruptPdf {
            name: name.to_string(),
            detail: "document has no pages".into(),
        });
    }
    if total > options.max_pages {
        warn!(
            "{}: {} pages, only the first {} are transcribed",
            name, total, options.max_pages
        );
    }
    info!("{}: rendering {} page(s)", name, total.min(options.max_pages));

    let mut images = Vec::with_capacity(total.min(options.max_pages));
    for (idx, page) in pages.iter().take(options.max_pages).enumerate() {
        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width(page.width().value, options))
            .set_maximum_height(options.max_rendered_pixels as i32);

        let image = page
            .render_with_config(&render_config)
            .map_err(|e| ClassifyError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?
            .as_image();

        debug!(
            "{}: page {} → {}x{} px",
            name,
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    Ok(images)
}

/// Pixel width for a page `width_pt` points wide at the configured DPI,
/// capped at `max_rendered_pixels`.
fn target_width(width_pt: f32, options: &RenderOptions) -> i32 {
    let at_dpi = (width_pt * options.dpi as f32 / 72.0).round() as i32;
    let cap = i32::try_from(options.max_rendered_pixels)
        .unwrap_or(i32::MAX)
        .max(1);
    at_dpi.clamp(1, cap)
}

/// Load the pdfium library.
pub fn bind_pdfium() -> Result<Pdfium, ClassifyError> {
    let mut attempts: Vec<String> = Vec::new();

    if let Ok(configured) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(&configured);
        let path = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        match Pdfium::bind_to_library(&path) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(e) => attempts.push(format!("{}: {e:?}", path.display())),
        }
    }

    match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(e) => attempts.push(format!("./: {e:?}")),
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| {
            attempts.push(format!("system: {e:?}"));
            ClassifyError::PdfiumBindingFailed(attempts.join("; "))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(dpi: u32, max: u32) -> RenderOptions {
        RenderOptions {
            dpi,
            max_rendered_pixels: max,
            max_pages: 20,
            password: None,
        }
    }

    #[test]
    fn a4_at_150_dpi() {
        // A4 is 595 pt wide.
        assert_eq!(target_width(595.0, &opts(150, 2000)), 1240);
    }

    #[test]
    fn width_is_capped() {
        // A0 poster.
        assert_eq!(target_width(2384.0, &opts(300, 2000)), 2000);
    }

    #[test]
    fn degenerate_cap_still_yields_a_pixel() {
        assert_eq!(target_width(595.0, &opts(150, 0)), 1);
        assert_eq!(target_width(595.0, &opts(150, u32::MAX)), 1240);
    }
}

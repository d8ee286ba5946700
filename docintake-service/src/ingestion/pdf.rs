//! PDF access through PDFium: per-page native text and page rasterization.

use std::path::Path;

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use crate::error::{ProcessingError, ServiceResult};

/// Maximum width or height of a rasterized page, in pixels
const MAX_RENDER_DIMENSION_PX: f32 = 4096.0;

/// PDF points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Create a new Pdfium instance (dynamically linked).
///
/// Searches for libpdfium in:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` (explicit path to the library file)
/// 2. Current directory (./libpdfium.so)
/// 3. vendor/pdfium/lib/
/// 4. System library paths
pub fn create_pdfium() -> Result<Pdfium, ProcessingError> {
    let explicit = std::env::var("PDFIUM_DYNAMIC_LIB_PATH")
        .ok()
        .map(Pdfium::bind_to_library);
    let bindings = match explicit {
        Some(Ok(bindings)) => Ok(bindings),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
    }
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ProcessingError::TextExtraction {
            page: 0,
            source: Box::new(std::io::Error::other(format!(
                "Failed to load PDFium library. Set PDFIUM_DYNAMIC_LIB_PATH or install libpdfium: {:?}",
                e
            ))),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Load a PDF document from disk
pub fn load_document<'a>(pdfium: &'a Pdfium, path: &Path) -> ServiceResult<PdfDocument<'a>> {
    let document =
        pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| ProcessingError::TextExtraction {
                page: 0,
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Failed to load PDF: {:?}", e),
                )),
            })?;
    Ok(document)
}

/// Native text layer of one page. Pages without a text layer yield "".
pub fn page_text(page: &PdfPage, page_num: usize) -> ServiceResult<String> {
    let text = page.text().map_err(|e| {
        warn!(page = page_num, error = ?e, "Failed to get text object for page");
        ProcessingError::TextExtraction {
            page: page_num as u32,
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Failed to extract text from page {}: {:?}", page_num, e),
            )),
        }
    })?;
    Ok(text.all())
}

/// Extract the native text of every page, in page order.
pub fn extract_page_texts(path: &Path) -> ServiceResult<Vec<String>> {
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, path)?;

    let mut pages = Vec::new();
    for (page_index, page) in document.pages().iter().enumerate() {
        pages.push(page_text(&page, page_index + 1)?);
    }

    debug!(path = %path.display(), pages = pages.len(), "Extracted PDF page text");
    Ok(pages)
}

/// Rasterize a page at `dpi`, capping the larger side at 4096 pixels.
pub fn render_page(page: &PdfPage, page_num: usize, dpi: u32) -> ServiceResult<DynamicImage> {
    let (width, height) = render_dimensions(page.width().value, page.height().value, dpi);

    let config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_target_height(height);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| ProcessingError::TextExtraction {
            page: page_num as u32,
            source: Box::new(std::io::Error::other(format!(
                "Failed to render page: {}",
                e
            ))),
        })?;

    Ok(bitmap.as_image())
}

/// Pixel dimensions for a page of the given size in points, preserving
/// aspect ratio when the cap applies.
fn render_dimensions(width_pts: f32, height_pts: f32, dpi: u32) -> (i32, i32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let mut width = (width_pts * scale).max(1.0);
    let mut height = (height_pts * scale).max(1.0);

    let largest = width.max(height);
    if largest > MAX_RENDER_DIMENSION_PX {
        let shrink = MAX_RENDER_DIMENSION_PX / largest;
        width = (width * shrink).max(1.0);
        height = (height * shrink).max(1.0);
    }

    (width.round() as i32, height.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_dimensions_letter_page() {
        // US Letter at 200 DPI
        let (w, h) = render_dimensions(612.0, 792.0, 200);
        assert_eq!((w, h), (1700, 2200));
    }

    #[test]
    fn test_render_dimensions_capped() {
        let (w, h) = render_dimensions(612.0, 792.0, 600);
        assert_eq!(h, 4096);
        assert!(w < h);
        // Aspect ratio preserved within rounding
        let ratio = w as f32 / h as f32;
        assert!((ratio - 612.0 / 792.0).abs() < 0.01);
    }

    #[test]
    fn test_render_dimensions_never_zero() {
        let (w, h) = render_dimensions(0.0, 0.0, 200);
        assert_eq!((w, h), (1, 1));
    }
}

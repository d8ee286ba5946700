//! OCR fallback: PDF rasterization and image preprocessing ahead of a
//! Tesseract run.

pub mod preprocess;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::error::{ProcessingError, ServiceResult};
use crate::ingestion::{file_extension, pdf};
use crate::models::PageText;

/// Recognizes text in a PNG-encoded image.
pub trait OcrEngine: Send + Sync {
    fn ocr_image(&self, png: &[u8], language: &str) -> Result<String, ProcessingError>;
}

/// Tesseract invoked as an external process
pub struct TesseractCli {
    binary: PathBuf,
}

impl TesseractCli {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| PathBuf::from("tesseract")),
        }
    }

    /// True when the binary runs and reports a version
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image(&self, png: &[u8], language: &str) -> Result<String, ProcessingError> {
        let mut input = tempfile::Builder::new()
            .prefix("ocr_input")
            .suffix(".png")
            .tempfile()
            .map_err(ProcessingError::Io)?;
        input.write_all(png).map_err(ProcessingError::Io)?;
        input.flush().map_err(ProcessingError::Io)?;

        // tesseract <image> stdout -l <lang> --psm 3 --oem 3
        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .args(["-l", language, "--psm", "3", "--oem", "3"])
            .output()
            .map_err(|e| ProcessingError::Ocr {
                message: format!(
                    "Failed to run tesseract at '{}': {}",
                    self.binary.display(),
                    e
                ),
            })?;

        if !output.status.success() {
            return Err(ProcessingError::Ocr {
                message: format!(
                    "tesseract exited with code {}: {}",
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Text recovered by OCR from one file
#[derive(Debug, Clone, Default)]
pub struct OcrOutput {
    pub text: String,
    /// Per-page text; empty for single images
    pub pages: Vec<PageText>,
}

/// OCR over PDFs and raster images
pub struct OcrService {
    engine: Arc<dyn OcrEngine>,
    language: String,
    render_dpi: u32,
}

impl OcrService {
    pub fn new(engine: Arc<dyn OcrEngine>, config: &OcrConfig) -> Self {
        Self {
            engine,
            language: config.language.clone(),
            render_dpi: config.render_dpi,
        }
    }

    /// OCR a stored file, choosing the PDF or image path by extension.
    pub fn extract_from_path(&self, path: &Path) -> ServiceResult<OcrOutput> {
        match file_extension(path).as_deref() {
            Some("pdf") => {
                let pages = self.extract_text_from_pdf(path)?;
                Ok(OcrOutput {
                    text: join_pages(&pages),
                    pages,
                })
            }
            _ => {
                let bytes = std::fs::read(path).map_err(ProcessingError::Io)?;
                Ok(OcrOutput {
                    text: self.extract_text_from_image(&bytes)?,
                    pages: Vec::new(),
                })
            }
        }
    }

    /// Decode, clean up and OCR an encoded image. Output is trimmed.
    pub fn extract_text_from_image(&self, bytes: &[u8]) -> ServiceResult<String> {
        let image = image::load_from_memory(bytes).map_err(ProcessingError::ImageDecode)?;
        let png = preprocess::prepare_for_ocr(&image)?;
        let text = self.engine.ocr_image(&png, &self.language)?;
        metrics::counter!("ocr_pages_total").increment(1);
        Ok(text.trim().to_string())
    }

    /// Per-page text of a PDF. Pages with a native text layer keep it;
    /// the rest are rendered and OCR'd.
    pub fn extract_text_from_pdf(&self, path: &Path) -> ServiceResult<Vec<PageText>> {
        let pdfium = pdf::create_pdfium()?;
        let document = pdf::load_document(&pdfium, path)?;

        let mut pages = Vec::new();
        let mut ocr_pages = 0usize;
        for (page_index, page) in document.pages().iter().enumerate() {
            let page_number = page_index + 1;

            let native = pdf::page_text(&page, page_number).unwrap_or_else(|e| {
                warn!(page = page_number, error = %e, "Native page text unavailable");
                String::new()
            });

            let (text, ocr_used) = self.page_text_or_ocr(page_number, native, || {
                pdf::render_page(&page, page_number, self.render_dpi)
            })?;
            if ocr_used {
                ocr_pages += 1;
            }

            pages.push(PageText { page_number, text });
        }

        info!(
            path = %path.display(),
            pages = pages.len(),
            ocr_pages,
            "PDF OCR complete"
        );
        Ok(pages)
    }

    /// Native text of a page when it has any, otherwise OCR of the page
    /// image produced by `render`. The flag reports whether OCR ran.
    fn page_text_or_ocr<F>(
        &self,
        page_number: usize,
        native: String,
        render: F,
    ) -> ServiceResult<(String, bool)>
    where
        F: FnOnce() -> ServiceResult<DynamicImage>,
    {
        if !native.trim().is_empty() {
            return Ok((native, false));
        }

        debug!(page = page_number, "Page has no text layer, running OCR");
        let image = render()?;
        let png = preprocess::prepare_for_ocr(&image)?;
        let text = self.engine.ocr_image(&png, &self.language)?;
        metrics::counter!("ocr_pages_total").increment(1);
        Ok((text.trim().to_string(), true))
    }
}

/// Document text from per-page text, one page after another
fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

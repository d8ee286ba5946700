pub mod hash;
pub mod office;
pub mod pdf;
pub mod tabular;

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{ProcessingError, ServiceError, ServiceResult, format_error_chain_ref};

/// Upload validation, storage and native text extraction
pub struct IngestionService {
    upload_dir: PathBuf,
    max_file_size: u64,
    allowed_extensions: Vec<String>,
}

impl IngestionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            upload_dir: config.storage.upload_dir.clone(),
            max_file_size: config.limits.max_file_size_bytes,
            allowed_extensions: config
                .limits
                .allowed_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Reject disallowed extensions and oversized files
    pub fn validate_upload(&self, filename: &str, size: u64) -> ServiceResult<()> {
        let extension = match file_extension(Path::new(filename)) {
            Some(ext) => format!(".{}", ext),
            None => String::new(),
        };

        if !self.allowed_extensions.contains(&extension) {
            return Err(ServiceError::Processing(
                ProcessingError::UnsupportedFormat {
                    format: if extension.is_empty() {
                        "(none)".to_string()
                    } else {
                        extension
                    },
                    allowed: self.allowed_extensions.join(", "),
                },
            ));
        }

        if size > self.max_file_size {
            return Err(ServiceError::Processing(ProcessingError::FileTooLarge {
                size,
                max: self.max_file_size,
            }));
        }

        Ok(())
    }

    /// Write upload bytes under the upload directory, never overwriting
    /// an existing file.
    pub fn save_upload(&self, content: &[u8], filename: &str) -> ServiceResult<PathBuf> {
        std::fs::create_dir_all(&self.upload_dir).map_err(ProcessingError::Io)?;

        let name = safe_file_name(filename);
        let path = unique_path(&self.upload_dir, &name);
        std::fs::write(&path, content).map_err(ProcessingError::Io)?;

        debug!(path = %path.display(), bytes = content.len(), "Saved upload");
        Ok(path)
    }

    /// Native text of a stored document, chosen by extension.
    ///
    /// Formats without a text layer (images) yield an empty string. A
    /// failed extraction is logged and also yields an empty string.
    pub fn extract_text(&self, path: &Path) -> String {
        let extension = file_extension(path).unwrap_or_default();

        let result = match extension.as_str() {
            "pdf" => pdf::extract_page_texts(path).map(|pages| {
                pages
                    .iter()
                    .map(|page| format!("{}\n", page))
                    .collect::<String>()
            }),
            "docx" | "doc" => office::extract_docx(path),
            "xlsx" => office::extract_xlsx(path),
            "csv" => tabular::extract_csv(path),
            "txt" | "md" => std::fs::read_to_string(path)
                .map_err(|e| ServiceError::Processing(ProcessingError::Io(e))),
            _ => {
                debug!(path = %path.display(), format = %extension, "No native text layer");
                Ok(String::new())
            }
        };

        match result {
            Ok(text) => {
                info!(
                    path = %path.display(),
                    format = %extension,
                    chars = text.chars().count(),
                    "Extracted native text"
                );
                text
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    format = %extension,
                    error = %format_error_chain_ref(&e),
                    "Text extraction failed"
                );
                String::new()
            }
        }
    }
}

/// Lower-cased extension without the leading dot
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// True for formats the OCR fallback can read
pub fn is_ocr_candidate(path: &Path) -> bool {
    matches!(
        file_extension(path).as_deref(),
        Some("pdf" | "jpg" | "jpeg" | "png" | "tiff" | "tif" | "bmp")
    )
}

/// Reduce a client-declared name to its final path component
fn safe_file_name(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        "upload".to_string()
    } else {
        name.to_string()
    }
}

/// First free path among `name`, `{stem}_1{ext}`, `{stem}_2{ext}`, ...
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

//! Service configuration loaded from `config.toml` and `DOCINTAKE__*`
//! environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_limits")]
    pub limits: LimitsConfig,

    #[serde(default = "default_ocr")]
    pub ocr: OcrConfig,

    #[serde(default = "default_ollama")]
    pub ollama: OllamaConfig,

    #[serde(default = "default_analysis")]
    pub analysis: AnalysisConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix every API route is nested under
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Service name reported by the health endpoint
    #[serde(default = "default_project_name")]
    pub project_name: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

/// Upload limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,

    /// Accepted file extensions, including the leading dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

/// OCR configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Path to the tesseract binary. `None` means look it up on PATH.
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,

    #[serde(default = "default_ocr_language")]
    pub language: String,

    /// DPI used when rasterizing PDF pages without a text layer
    #[serde(default = "default_render_dpi")]
    pub render_dpi: u32,

    /// Extracted text shorter than this (after trimming) triggers OCR
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

/// Ollama model backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    /// When disabled, model-backed classification and tagging are skipped
    #[serde(default = "default_ollama_enabled")]
    pub enabled: bool,

    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl OllamaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Text analysis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Number of leading sentences kept by the summarizer
    #[serde(default = "default_summary_sentences")]
    pub summary_sentences: usize,

    /// Text must be longer than this many characters to get a summary
    #[serde(default = "default_summary_min_chars")]
    pub summary_min_chars: usize,
}

impl AppConfig {
    /// Load configuration from `config.toml` (optional) and environment
    pub fn load() -> ServiceResult<Self> {
        Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("DOCINTAKE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("limits.allowed_extensions")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            limits: default_limits(),
            ocr: default_ocr(),
            ollama: default_ollama(),
            analysis: default_analysis(),
        }
    }
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
        api_prefix: default_api_prefix(),
        project_name: default_project_name(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_project_name() -> String {
    "Smart Document Processing API".to_string()
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        upload_dir: default_upload_dir(),
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_limits() -> LimitsConfig {
    LimitsConfig {
        max_file_size_bytes: default_max_file_size(),
        allowed_extensions: default_allowed_extensions(),
    }
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50 MiB
}

fn default_allowed_extensions() -> Vec<String> {
    [
        ".pdf", ".docx", ".txt", ".jpg", ".jpeg", ".png", ".tiff", ".xlsx", ".csv",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ocr() -> OcrConfig {
    OcrConfig {
        tesseract_path: None,
        language: default_ocr_language(),
        render_dpi: default_render_dpi(),
        min_text_chars: default_min_text_chars(),
    }
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_render_dpi() -> u32 {
    200
}

fn default_min_text_chars() -> usize {
    50
}

fn default_ollama() -> OllamaConfig {
    OllamaConfig {
        enabled: default_ollama_enabled(),
        base_url: default_ollama_url(),
        model: default_model(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

fn default_ollama_enabled() -> bool {
    true
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_analysis() -> AnalysisConfig {
    AnalysisConfig {
        summary_sentences: default_summary_sentences(),
        summary_min_chars: default_summary_min_chars(),
    }
}

fn default_summary_sentences() -> usize {
    3
}

fn default_summary_min_chars() -> usize {
    500
}

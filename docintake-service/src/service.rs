mod document_processing;

pub use document_processing::{BatchItem, BatchSubmission, DocumentFile};

use std::sync::Arc;
use tracing::{info, warn};

use crate::analysis::AiProcessor;
use crate::config::AppConfig;
use crate::error::ServiceResult;
use crate::ingestion::IngestionService;
use crate::ocr::{OcrEngine, OcrService, TesseractCli};
use crate::ollama::OllamaClient;
use crate::store::DocumentStore;

/// Main service coordinator
#[derive(Clone)]
pub struct DocumentService {
    pub config: Arc<AppConfig>,
    pub store: Arc<DocumentStore>,
    pub ingestion: Arc<IngestionService>,
    pub ocr: Arc<OcrService>,
    pub ai: Arc<AiProcessor>,
}

impl DocumentService {
    /// Create a new service instance with the Tesseract CLI engine and,
    /// when enabled, an Ollama client
    pub fn new(config: AppConfig) -> ServiceResult<Self> {
        info!("Initializing document intake service");

        let tesseract = TesseractCli::new(config.ocr.tesseract_path.clone());
        if tesseract.is_available() {
            info!("Tesseract is available");
        } else {
            warn!("Tesseract is not available; OCR requests will fail");
        }

        let ollama = if config.ollama.enabled {
            info!(url = %config.ollama.base_url, model = %config.ollama.model, "Ollama model backend enabled");
            Some(Arc::new(OllamaClient::new(config.ollama.clone())?))
        } else {
            info!("Ollama model backend disabled");
            None
        };

        Ok(Self::with_components(config, Arc::new(tesseract), ollama))
    }

    /// Assemble the service from explicit engines
    pub fn with_components(
        config: AppConfig,
        ocr_engine: Arc<dyn OcrEngine>,
        ollama: Option<Arc<OllamaClient>>,
    ) -> Self {
        let ingestion = Arc::new(IngestionService::new(&config));
        let ocr = Arc::new(OcrService::new(ocr_engine, &config.ocr));
        let ai = Arc::new(AiProcessor::new(ollama, &config.analysis));

        Self {
            config: Arc::new(config),
            store: Arc::new(DocumentStore::new()),
            ingestion,
            ocr,
            ai,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ocr::tests::MockOcrEngine;
    use std::path::Path;

    /// Service rooted in `dir` with a canned OCR engine and no model backend
    pub(crate) fn test_service(dir: &Path, ocr_text: &str) -> DocumentService {
        let mut config = AppConfig::default();
        config.storage.upload_dir = dir.to_path_buf();
        config.ollama.enabled = false;
        DocumentService::with_components(config, Arc::new(MockOcrEngine::new(ocr_text)), None)
    }

    #[test]
    fn test_new_without_model_backend() {
        let mut config = AppConfig::default();
        config.ollama.enabled = false;
        config.ocr.tesseract_path = Some("/nonexistent/tesseract".into());
        let service = DocumentService::new(config).unwrap();
        assert_eq!(service.store.len(), 0);
    }
}

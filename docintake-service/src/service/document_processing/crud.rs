//! Document reads and raw-text analysis.

use std::path::PathBuf;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{Classification, Document, Entity};
use crate::service::DocumentService;

/// Stored file of a document, for download
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub filename: String,
    pub path: PathBuf,
}

impl DocumentService {
    fn not_found(document_id: &str) -> ServiceError {
        ServiceError::DocumentNotFound {
            document_id: document_id.to_string(),
        }
    }

    pub fn get_document(&self, document_id: &str) -> ServiceResult<Document> {
        self.store
            .get(document_id)
            .ok_or_else(|| Self::not_found(document_id))
    }

    /// List documents in upload order
    pub fn list_documents(&self, skip: usize, limit: usize) -> Vec<Document> {
        self.store.list(skip, limit)
    }

    /// Text from the last completed run; `None` if never extracted
    pub fn document_text(&self, document_id: &str) -> ServiceResult<Option<String>> {
        self.store
            .text(document_id)
            .ok_or_else(|| Self::not_found(document_id))
    }

    /// Entities from the last completed run
    pub fn document_entities(&self, document_id: &str) -> ServiceResult<Vec<Entity>> {
        self.store
            .entities(document_id)
            .ok_or_else(|| Self::not_found(document_id))
    }

    pub fn document_file(&self, document_id: &str) -> ServiceResult<DocumentFile> {
        let document = self.get_document(document_id)?;
        Ok(DocumentFile {
            filename: document.filename,
            path: document.file_path,
        })
    }

    pub async fn classify_text(&self, text: &str) -> Classification {
        self.ai.classify(text).await
    }

    pub async fn extract_entities_from_text(&self, text: &str) -> Vec<Entity> {
        self.ai.extract_entities(text).await
    }
}

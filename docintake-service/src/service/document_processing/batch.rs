//! Background batch runs and in-place re-extraction.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::models::{ExtractionOptions, ExtractionResult, ProcessingStatus};
use crate::service::DocumentService;

/// Operations applied when a batch request names none
pub const DEFAULT_BATCH_OPERATIONS: &[&str] = &["extract", "classify"];

/// Reply to a batch submission
#[derive(Debug, Clone, Serialize)]
pub struct BatchSubmission {
    pub batch_id: String,
    /// Number of known documents that were queued
    pub total_documents: usize,
    pub results: Vec<BatchItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub document_id: String,
    pub status: String,
    pub batch_id: String,
}

impl DocumentService {
    /// Reprocess a stored document with new options.
    pub async fn reextract(
        &self,
        document_id: &str,
        options: ExtractionOptions,
    ) -> ServiceResult<ExtractionResult> {
        if !self.store.set_status(document_id, ProcessingStatus::Pending) {
            return Err(ServiceError::DocumentNotFound {
                document_id: document_id.to_string(),
            });
        }
        self.process_document(document_id, options).await
    }

    /// Start one background processing task per known document.
    ///
    /// Unknown ids are skipped. Tasks are fire-and-forget: their outcome
    /// is visible only through each document's status.
    pub fn batch_process(&self, document_ids: &[String], operations: &[String]) -> BatchSubmission {
        let batch_id = uuid::Uuid::new_v4().to_string();
        let options = if operations.is_empty() {
            ExtractionOptions::from_operations(DEFAULT_BATCH_OPERATIONS)
        } else {
            ExtractionOptions::from_operations(operations)
        };

        let mut results = Vec::new();
        for doc_id in document_ids {
            if !self.store.contains(doc_id) {
                debug!(doc_id = %doc_id, batch_id = %batch_id, "Skipping unknown document in batch");
                continue;
            }

            self.store.set_status(doc_id, ProcessingStatus::Pending);
            let service = self.clone();
            let task_doc_id = doc_id.clone();
            let task_batch_id = batch_id.clone();
            tokio::spawn(async move {
                if let Err(e) = service.process_document(&task_doc_id, options).await {
                    warn!(
                        doc_id = %task_doc_id,
                        batch_id = %task_batch_id,
                        error = %e,
                        "Batch item failed"
                    );
                }
            });

            results.push(BatchItem {
                document_id: doc_id.clone(),
                status: "queued".to_string(),
                batch_id: batch_id.clone(),
            });
        }

        info!(
            batch_id = %batch_id,
            requested = document_ids.len(),
            queued = results.len(),
            ?options,
            "Batch submitted"
        );

        BatchSubmission {
            batch_id,
            total_documents: results.len(),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::models::{Document, DocumentType, ExtractionOptions, ProcessingStatus};
    use crate::service::DocumentService;
    use crate::service::tests::test_service;

    fn store_text(service: &DocumentService, name: &str, body: &str) -> String {
        let path = service.ingestion.save_upload(body.as_bytes(), name).unwrap();
        let document = Document::new(name, path, body.len() as u64);
        let id = document.id.clone();
        service.store.insert(document);
        id
    }

    async fn wait_for_completion(service: &DocumentService, id: &str) -> Document {
        for _ in 0..200 {
            let doc = service.get_document(id).unwrap();
            if matches!(
                doc.processing_status,
                ProcessingStatus::Completed | ProcessingStatus::Failed
            ) {
                return doc;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("document {} did not finish", id);
    }

    #[tokio::test]
    async fn test_batch_skips_unknown_and_runs_known() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), "");
        let a = store_text(&service, "a.txt", "This employment contract sets out the terms and duties.");
        let b = store_text(&service, "b.txt", "Curriculum vitae: ten years experience in logistics planning.");

        let ids = vec![a.clone(), "missing".to_string(), b.clone()];
        let submission = service.batch_process(&ids, &[]);

        assert_eq!(submission.total_documents, 2);
        assert_eq!(submission.results.len(), 2);
        assert!(submission.results.iter().all(|r| r.status == "queued"));
        assert!(
            submission
                .results
                .iter()
                .all(|r| r.batch_id == submission.batch_id)
        );

        // Default operations are extract + classify
        let doc_a = wait_for_completion(&service, &a).await;
        let doc_b = wait_for_completion(&service, &b).await;
        assert_eq!(doc_a.document_type, Some(DocumentType::Contract));
        assert_eq!(doc_b.document_type, Some(DocumentType::Resume));
        assert_eq!(
            doc_a.metadata["operations_performed"]["extract_entities"],
            false
        );
    }

    #[tokio::test]
    async fn test_reextract_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), "");
        let id = store_text(
            &service,
            "r.txt",
            "Receipt no. 5521. Payment of $18.00 received, thank you for your purchase.",
        );

        let options = ExtractionOptions {
            extract_text: true,
            perform_ocr: false,
            extract_entities: true,
            classify_document: true,
        };
        let result = service.reextract(&id, options).await.unwrap();
        assert_eq!(result.document_id, id);
        assert_eq!(result.document_type, Some(DocumentType::Receipt));
        assert!(!result.entities.unwrap().is_empty());
        assert_eq!(service.store.len(), 1);
        assert_eq!(
            service.get_document(&id).unwrap().processing_status,
            ProcessingStatus::Completed
        );

        let err = service.reextract("missing", options).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::ServiceError::DocumentNotFound { .. }
        ));
    }
}

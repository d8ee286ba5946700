//! Main document processing pipeline.

use std::time::Instant;

use serde_json::json;
use tracing::{debug, error, info};

use crate::error::{ServiceError, ServiceResult, format_error_chain_ref};
use crate::ingestion::is_ocr_candidate;
use crate::models::{Document, ExtractionOptions, ExtractionResult, ProcessingStatus};
use crate::service::DocumentService;

fn join_error(e: tokio::task::JoinError) -> ServiceError {
    ServiceError::Internal {
        message: format!("Blocking task failed: {}", e),
    }
}

impl DocumentService {
    /// Run the pipeline for a stored document and record the outcome.
    ///
    /// The status moves to `processing`, then to `completed` or `failed`.
    /// Failures are recorded under `metadata.error` and surface as
    /// `PipelineFailed`.
    pub(crate) async fn process_document(
        &self,
        doc_id: &str,
        options: ExtractionOptions,
    ) -> ServiceResult<ExtractionResult> {
        let document = self.get_document(doc_id)?;

        self.store.set_status(doc_id, ProcessingStatus::Processing);
        info!(doc_id = %doc_id, filename = %document.filename, ?options, "Processing document");

        let started = Instant::now();
        let outcome = self.run_pipeline(&document, options).await;
        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!("document_processing_seconds").record(elapsed);

        match outcome {
            Ok(mut result) => {
                result.processing_time = elapsed;
                let page_count = (!result.pages.is_empty()).then_some(result.pages.len());

                self.store.update(doc_id, |doc| {
                    doc.processing_status = ProcessingStatus::Completed;
                    if let Some(document_type) = result.document_type {
                        doc.document_type = Some(document_type);
                    }
                    if page_count.is_some() {
                        doc.page_count = page_count;
                    }
                    doc.metadata.remove("error");
                    doc.metadata
                        .insert("processing_time".to_string(), json!(elapsed));
                    doc.metadata
                        .insert("page_count".to_string(), json!(page_count.unwrap_or(0)));
                    doc.metadata.insert(
                        "operations_performed".to_string(),
                        serde_json::to_value(options).unwrap_or_default(),
                    );
                });
                self.store.set_extraction(
                    doc_id,
                    result.text_content.clone(),
                    result.entities.clone().unwrap_or_default(),
                );

                metrics::counter!("documents_processed_total", "status" => "completed")
                    .increment(1);
                info!(
                    doc_id = %doc_id,
                    seconds = elapsed,
                    document_type = ?result.document_type,
                    "Document processed successfully"
                );
                Ok(result)
            }
            Err(e) => {
                let message = format_error_chain_ref(&e);
                error!(doc_id = %doc_id, error = %message, "Document processing failed");

                self.store.update(doc_id, |doc| {
                    doc.processing_status = ProcessingStatus::Failed;
                    doc.metadata.insert("error".to_string(), json!(message));
                });
                metrics::counter!("documents_processed_total", "status" => "failed").increment(1);

                Err(ServiceError::PipelineFailed { message })
            }
        }
    }

    async fn run_pipeline(
        &self,
        document: &Document,
        options: ExtractionOptions,
    ) -> ServiceResult<ExtractionResult> {
        let doc_id = &document.id;
        let mut result = ExtractionResult::empty(doc_id);

        // Step 1: native text, then OCR when asked for or when native text is thin
        if options.extract_text || options.perform_ocr {
            let mut text = String::new();

            if options.extract_text {
                let ingestion = self.ingestion.clone();
                let path = document.file_path.clone();
                text = tokio::task::spawn_blocking(move || ingestion.extract_text(&path))
                    .await
                    .map_err(join_error)?;
            }

            let thin = options.extract_text
                && text.trim().chars().count() < self.config.ocr.min_text_chars;
            if (options.perform_ocr || thin) && is_ocr_candidate(&document.file_path) {
                debug!(doc_id = %doc_id, explicit = options.perform_ocr, "Running OCR");
                let ocr = self.ocr.clone();
                let path = document.file_path.clone();
                let output = tokio::task::spawn_blocking(move || ocr.extract_from_path(&path))
                    .await
                    .map_err(join_error)?
                    .inspect_err(|e| {
                        error!(doc_id = %doc_id, error = %format_error_chain_ref(e), "OCR failed");
                    })?;
                text = output.text;
                result.pages = output.pages;
            }

            result.text_content = Some(text);
        }

        let text = result.text().to_string();
        let has_text = !text.trim().is_empty();

        // Step 2: classification
        if options.classify_document && has_text {
            let classification = self.ai.classify(&text).await;
            result.document_type = Some(classification.document_type);
            result.confidence = Some(classification.confidence);
        }

        // Step 3: entities, plus key-values for structured document types
        if options.extract_entities && has_text {
            result.entities = Some(self.ai.extract_entities(&text).await);

            let document_type = result.document_type.or(document.document_type);
            if document_type.is_some_and(|t| t.has_key_values()) {
                result.key_value_pairs = self.ai.extract_key_value_pairs(&text);
            }
        }

        // Step 4: summary of long text
        result.summary = self.ai.summarize(&text);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::AppConfig;
    use crate::error::ServiceError;
    use crate::models::{Document, DocumentType, ExtractionOptions, ProcessingStatus};
    use crate::ocr::tests::{FailingOcrEngine, png_bytes};
    use crate::service::DocumentService;
    use crate::service::tests::test_service;

    fn all_steps() -> ExtractionOptions {
        ExtractionOptions {
            extract_text: true,
            perform_ocr: false,
            extract_entities: true,
            classify_document: true,
        }
    }

    fn store_file(service: &DocumentService, name: &str, content: &[u8]) -> String {
        let path = service.ingestion.save_upload(content, name).unwrap();
        let document = Document::new(name, path, content.len() as u64);
        let id = document.id.clone();
        service.store.insert(document);
        id
    }

    #[tokio::test]
    async fn test_short_text_image_triggers_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(
            dir.path(),
            "RECEIPT\nThank you for your purchase\nTotal: $12.40 Tax: $0.90",
        );
        let id = store_file(&service, "scan.png", &png_bytes());

        let result = service.process_document(&id, all_steps()).await.unwrap();

        assert!(result.text().starts_with("RECEIPT"));
        // "total" is an invoice keyword and outranks the receipt rule
        assert_eq!(result.document_type, Some(DocumentType::Invoice));
        assert_eq!(result.confidence, Some(0.90));
        assert_eq!(
            result.key_value_pairs.get("total").map(String::as_str),
            Some("Total: $12.40")
        );
        assert_eq!(
            result.key_value_pairs.get("tax").map(String::as_str),
            Some("Tax: $0.90")
        );

        let doc = service.get_document(&id).unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Completed);
        assert!(doc.metadata.contains_key("processing_time"));
        assert_eq!(doc.metadata["operations_performed"]["extract_entities"], true);
        assert!(!doc.metadata.contains_key("error"));
    }

    #[tokio::test]
    async fn test_long_native_text_skips_ocr() {
        let dir = tempfile::tempdir().unwrap();
        // OCR output would be obviously different
        let service = test_service(dir.path(), "FROM OCR");
        let body = "Quarterly report on regional rainfall and river levels across the basin.";
        let id = store_file(&service, "notes.txt", body.as_bytes());

        let result = service.process_document(&id, all_steps()).await.unwrap();
        assert_eq!(result.text(), body);
        assert!(result.pages.is_empty());
        // No keyword rule matches and the model backend is off
        assert_eq!(result.document_type, Some(DocumentType::Other));
        assert_eq!(result.confidence, Some(0.5));
        assert!(result.key_value_pairs.is_empty());

        let doc = service.get_document(&id).unwrap();
        assert_eq!(doc.metadata["page_count"], 0);
        assert_eq!(doc.page_count, None);
    }

    #[tokio::test]
    async fn test_key_values_only_for_structured_types() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), "");
        let body = "Service agreement between the parties. Balance: 300.00 due 04/05/2024.";
        let id = store_file(&service, "contract.txt", body.as_bytes());

        let result = service.process_document(&id, all_steps()).await.unwrap();
        assert_eq!(result.document_type, Some(DocumentType::Contract));
        assert!(result.entities.as_ref().is_some_and(|e| !e.is_empty()));
        assert!(result.key_value_pairs.is_empty());
    }

    #[tokio::test]
    async fn test_flags_gate_steps() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), "");
        let id = store_file(&service, "a.txt", b"Invoice total due on receipt of goods and services rendered.");

        let options = ExtractionOptions {
            extract_text: true,
            ..ExtractionOptions::default()
        };
        let result = service.process_document(&id, options).await.unwrap();
        assert!(result.text_content.is_some());
        assert!(result.document_type.is_none());
        assert!(result.entities.is_none());
        assert!(result.summary.is_none());

        let none = ExtractionOptions {
            extract_text: false,
            ..ExtractionOptions::default()
        };
        let result = service.process_document(&id, none).await.unwrap();
        assert!(result.text_content.is_none());
    }

    #[tokio::test]
    async fn test_summary_for_long_text() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), "");
        let sentence = "The committee reviewed the annual figures in considerable detail. ";
        let body = sentence.repeat(10);
        let id = store_file(&service, "minutes.txt", body.as_bytes());

        let result = service
            .process_document(&id, ExtractionOptions::default())
            .await
            .unwrap();
        let expected = vec![sentence.trim(); 3].join(" ");
        assert_eq!(result.summary, Some(expected));
    }

    #[tokio::test]
    async fn test_ocr_failure_marks_document_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.upload_dir = dir.path().to_path_buf();
        config.ollama.enabled = false;
        let service = DocumentService::with_components(config, Arc::new(FailingOcrEngine), None);
        let id = store_file(&service, "scan.png", &png_bytes());

        let err = service
            .process_document(&id, ExtractionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PipelineFailed { .. }));
        assert!(err.to_string().starts_with("Processing failed: "));
        assert!(err.to_string().contains("engine unavailable"));

        let doc = service.get_document(&id).unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Failed);
        assert!(
            doc.metadata["error"]
                .as_str()
                .is_some_and(|m| m.contains("engine unavailable"))
        );
    }

    #[tokio::test]
    async fn test_unknown_document() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), "");
        let err = service
            .process_document("nope", ExtractionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DocumentNotFound { .. }));
    }
}

//! Document upload.

use tracing::info;

use crate::error::ServiceResult;
use crate::ingestion::hash::compute_content_hash;
use crate::models::{Document, ExtractionOptions};
use crate::service::DocumentService;

impl DocumentService {
    /// Validate, store and process an upload.
    ///
    /// Validation happens before anything touches disk. The returned record
    /// reflects the finished processing run.
    pub async fn upload_document(
        &self,
        content: &[u8],
        filename: &str,
        options: ExtractionOptions,
    ) -> ServiceResult<Document> {
        self.ingestion
            .validate_upload(filename, content.len() as u64)?;

        let path = self.ingestion.save_upload(content, filename)?;

        let mut document = Document::new(filename, path, content.len() as u64);
        document.metadata.insert(
            "sha256".to_string(),
            serde_json::Value::String(compute_content_hash(content)),
        );
        let doc_id = document.id.clone();

        info!(
            doc_id = %doc_id,
            filename = %filename,
            bytes = content.len(),
            "Document uploaded"
        );
        self.store.insert(document);
        metrics::counter!("documents_uploaded_total").increment(1);

        self.process_document(&doc_id, options).await?;

        self.get_document(&doc_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{ProcessingError, ServiceError};
    use crate::models::{DocumentType, ExtractionOptions, ProcessingStatus};
    use crate::service::tests::test_service;

    #[tokio::test]
    async fn test_upload_text_document() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), "");

        let body = "INVOICE\nInvoice # A-17\nDate: 01/02/2024\nTotal: $99.00\nThank you for your business.";
        let options = ExtractionOptions {
            extract_text: true,
            perform_ocr: false,
            extract_entities: true,
            classify_document: true,
        };
        let doc = service
            .upload_document(body.as_bytes(), "bill.txt", options)
            .await
            .unwrap();

        assert_eq!(doc.processing_status, ProcessingStatus::Completed);
        assert_eq!(doc.document_type, Some(DocumentType::Invoice));
        assert_eq!(doc.file_size, body.len() as u64);
        assert_eq!(doc.filename, "bill.txt");
        assert!(doc.file_path.starts_with(dir.path()));
        assert_eq!(
            doc.metadata["sha256"].as_str().map(str::len),
            Some(64)
        );
        assert_eq!(doc.metadata["operations_performed"]["classify_document"], true);

        assert_eq!(service.document_text(&doc.id).unwrap(), Some(body.to_string()));
    }

    #[tokio::test]
    async fn test_upload_rejected_before_storage() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), "");

        let err = service
            .upload_document(b"MZ", "tool.exe", ExtractionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Processing(ProcessingError::UnsupportedFormat { .. })
        ));

        let oversized = vec![b'a'; (service.config.limits.max_file_size_bytes + 1) as usize];
        let err = service
            .upload_document(&oversized, "big.txt", ExtractionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Processing(ProcessingError::FileTooLarge { .. })
        ));

        assert_eq!(service.store.len(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

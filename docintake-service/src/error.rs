use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: String },

    #[error("{0}")]
    Ollama(#[from] OllamaError),

    #[error("Document processing failed")]
    Processing(#[from] ProcessingError),

    /// A pipeline run failed after the document record was created.
    #[error("Processing failed: {message}")]
    PipelineFailed { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Ollama client errors
#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Connection failed to Ollama at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Generation failed (status {status}): {message}")]
    Generation { status: u16, message: String },

    #[error("Invalid response from Ollama")]
    InvalidResponse {
        #[source]
        source: serde_json::Error,
    },
}

/// Document processing errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to extract text from page {page}")]
    TextExtraction {
        page: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("File type {format} not allowed. Allowed types: {allowed}")]
    UnsupportedFormat { format: String, allowed: String },

    #[error("File too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("OCR failed: {message}")]
    Ocr { message: String },

    #[error("Failed to decode image")]
    ImageDecode(#[source] image::ImageError),

    #[error("IO error")]
    Io(#[source] std::io::Error),
}

/// API error response (matches Axum's built-in JsonRejection format)
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Ollama(OllamaError::ModelNotFound { .. }) => StatusCode::NOT_FOUND,
            ServiceError::Processing(ProcessingError::UnsupportedFormat { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ServiceError::Processing(ProcessingError::FileTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::DocumentNotFound { .. } => "document_not_found",
            ServiceError::Ollama(OllamaError::Connection { .. }) => "ollama_connection",
            ServiceError::Ollama(OllamaError::ModelNotFound { .. }) => "ollama_model_not_found",
            ServiceError::Ollama(OllamaError::Generation { .. }) => "ollama_generation",
            ServiceError::Ollama(OllamaError::InvalidResponse { .. }) => "ollama_invalid_response",
            ServiceError::Processing(ProcessingError::TextExtraction { .. }) => {
                "text_extraction_error"
            }
            ServiceError::Processing(ProcessingError::UnsupportedFormat { .. }) => {
                "unsupported_format"
            }
            ServiceError::Processing(ProcessingError::FileTooLarge { .. }) => "file_too_large",
            ServiceError::Processing(ProcessingError::Ocr { .. }) => "ocr_error",
            ServiceError::Processing(ProcessingError::ImageDecode(_)) => "image_decode_error",
            ServiceError::Processing(ProcessingError::Io(_)) => "io_error",
            ServiceError::PipelineFailed { .. } => "processing_failed",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }

    /// Client-facing message. Validation errors carry their detail; the
    /// wrapped processing variants need the source chain to be useful.
    fn client_message(&self) -> String {
        match self {
            ServiceError::Processing(
                inner @ (ProcessingError::UnsupportedFormat { .. }
                | ProcessingError::FileTooLarge { .. }
                | ProcessingError::Ocr { .. }),
            ) => inner.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %format_error_chain_ref(&self), "Request failed");
        }

        let response = ErrorResponse {
            message: self.client_message(),
            code: Some(self.error_code().to_string()),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Render an error followed by its `source()` chain, separated by `: `.
pub fn format_error_chain_ref(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let not_found = ServiceError::DocumentNotFound {
            document_id: "abc".to_string(),
        };
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let unsupported = ServiceError::Processing(ProcessingError::UnsupportedFormat {
            format: ".exe".to_string(),
            allowed: ".pdf".to_string(),
        });
        assert_eq!(unsupported.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let too_large = ServiceError::Processing(ProcessingError::FileTooLarge { size: 10, max: 5 });
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let failed = ServiceError::PipelineFailed {
            message: "boom".to_string(),
        };
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.to_string(), "Processing failed: boom");
    }

    #[test]
    fn test_format_error_chain() {
        let err = ServiceError::Processing(ProcessingError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing file",
        )));
        assert_eq!(
            format_error_chain_ref(&err),
            "Document processing failed: IO error: missing file"
        );
    }

    #[test]
    fn test_client_message_exposes_validation_detail() {
        let err = ServiceError::Processing(ProcessingError::FileTooLarge { size: 10, max: 5 });
        assert_eq!(err.client_message(), "File too large: 10 bytes (max 5 bytes)");
    }
}

//! Document API endpoints.
//!
//! Handlers for upload, re-extraction, listing, stored text and entities,
//! and file download.

use axum::{
    Json,
    body::Body,
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::error::{ProcessingError, ServiceError, ServiceResult};
use crate::models::{Document, Entity, ExtractionOptions, ExtractionResult};

use super::AppState;
use super::extract::{ApiJson, ApiQuery};

/// Processing flags accepted on the upload query string
#[derive(Debug, Default, Deserialize)]
pub struct UploadFlags {
    pub extract_text: Option<bool>,
    pub perform_ocr: Option<bool>,
    pub extract_entities: Option<bool>,
    pub classify_document: Option<bool>,
}

impl UploadFlags {
    fn apply(&self, options: &mut ExtractionOptions) {
        if let Some(v) = self.extract_text {
            options.extract_text = v;
        }
        if let Some(v) = self.perform_ocr {
            options.perform_ocr = v;
        }
        if let Some(v) = self.extract_entities {
            options.extract_entities = v;
        }
        if let Some(v) = self.classify_document {
            options.classify_document = v;
        }
    }
}

/// Re-extraction request
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub document_id: String,
    #[serde(flatten)]
    pub options: ExtractionOptions,
}

/// List documents query parameters
#[derive(Debug, Deserialize)]
pub struct ListDocumentsParams {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Serialize)]
pub struct DocumentTextResponse {
    pub document_id: String,
    pub text: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentEntitiesResponse {
    pub document_id: String,
    pub entities: Vec<Entity>,
}

fn invalid(message: impl std::fmt::Display) -> ServiceError {
    ServiceError::InvalidRequest {
        message: message.to_string(),
    }
}

/// Map a multipart read failure; a tripped body limit is an oversized file.
fn multipart_error(e: MultipartError, max: u64, declared: Option<u64>) -> ServiceError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::Processing(ProcessingError::FileTooLarge {
            size: declared.unwrap_or(max.saturating_add(1)),
            max,
        })
    } else {
        invalid(e)
    }
}

fn parse_flag(name: &str, value: &str) -> ServiceResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(invalid(format!("Invalid value '{}' for {}", other, name))),
    }
}

/// Upload a document and process it.
///
/// Flags may arrive as multipart fields or query parameters; fields win.
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(flags): ApiQuery<UploadFlags>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Document>, ServiceError> {
    let mut multipart = multipart?;
    let mut options = ExtractionOptions::default();
    flags.apply(&mut options);

    let max = state.service.config.limits.max_file_size_bytes;
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let read_error = |e: MultipartError| multipart_error(e, max, declared);

    let mut file_data: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let data = field.bytes().await.map_err(read_error)?;
                file_data = Some((data.to_vec(), filename));
            }
            "extract_text" | "perform_ocr" | "extract_entities" | "classify_document" => {
                let value = field.text().await.map_err(read_error)?;
                let flag = parse_flag(&name, &value)?;
                match name.as_str() {
                    "extract_text" => options.extract_text = flag,
                    "perform_ocr" => options.perform_ocr = flag,
                    "extract_entities" => options.extract_entities = flag,
                    _ => options.classify_document = flag,
                }
            }
            _ => {}
        }
    }

    let (data, filename) = file_data.ok_or_else(|| invalid("No file provided"))?;

    let document = state
        .service
        .upload_document(&data, &filename, options)
        .await?;

    Ok(Json(document))
}

/// Reprocess a stored document
pub async fn extract_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ExtractRequest>,
) -> Result<Json<ExtractionResult>, ServiceError> {
    let result = state
        .service
        .reextract(&request.document_id, request.options)
        .await?;
    Ok(Json(result))
}

/// List documents in upload order
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListDocumentsParams>,
) -> Json<Vec<Document>> {
    Json(state.service.list_documents(params.skip, params.limit))
}

/// Get a specific document by ID
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ServiceError> {
    Ok(Json(state.service.get_document(&id)?))
}

pub async fn get_document_text_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentTextResponse>, ServiceError> {
    let text = state.service.document_text(&id)?;
    Ok(Json(DocumentTextResponse {
        document_id: id,
        text,
    }))
}

pub async fn get_document_entities_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentEntitiesResponse>, ServiceError> {
    let entities = state.service.document_entities(&id)?;
    Ok(Json(DocumentEntitiesResponse {
        document_id: id,
        entities,
    }))
}

/// Stream the stored file as an attachment
pub async fn download_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let file = state.service.document_file(&id)?;

    let handle = tokio::fs::File::open(&file.path)
        .await
        .map_err(ProcessingError::Io)?;
    let body = Body::from_stream(ReaderStream::new(handle));

    let disposition = format!(
        "attachment; filename=\"{}\"",
        file.filename.replace(['"', '\\', '\r', '\n'], "_")
    );

    Ok((
        [
            (header::CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

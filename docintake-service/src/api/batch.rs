//! Batch processing endpoint.

use axum::{Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use crate::service::BatchSubmission;

use super::AppState;
use super::extract::ApiJson;

#[derive(Debug, Deserialize)]
pub struct BatchProcessRequest {
    pub document_ids: Vec<String>,
    /// Empty or absent means `["extract", "classify"]`
    #[serde(default)]
    pub operations: Vec<String>,
}

/// Queue background processing for each known document
pub async fn batch_process_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<BatchProcessRequest>,
) -> Json<BatchSubmission> {
    Json(
        state
            .service
            .batch_process(&request.document_ids, &request.operations),
    )
}

//! Raw-text analysis endpoints.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{Classification, Entity};

use super::AppState;
use super::extract::ApiJson;

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct EntitiesResponse {
    pub entities: Vec<Entity>,
}

pub async fn classify_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TextRequest>,
) -> Json<Classification> {
    Json(state.service.classify_text(&request.text).await)
}

pub async fn extract_entities_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TextRequest>,
) -> Json<EntitiesResponse> {
    let entities = state.service.extract_entities_from_text(&request.text).await;
    Json(EntitiesResponse { entities })
}

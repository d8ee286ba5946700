//! HTTP API for the document intake service.
//!
//! This module provides the REST API endpoints for:
//! - Health and metrics monitoring
//! - Document upload, extraction and retrieval
//! - Raw-text classification and entity extraction
//! - Batch processing

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::DocumentService;

pub mod analysis;
pub mod batch;
pub mod documents;
pub mod extract;
use analysis::{classify_handler, extract_entities_handler};
use batch::batch_process_handler;
use documents::{
    download_document_handler, extract_handler, get_document_entities_handler,
    get_document_handler, get_document_text_handler, list_documents_handler,
    upload_document_handler,
};

/// Multipart framing allowance on top of the largest accepted file
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state
pub struct AppState {
    pub service: DocumentService,
    pub start_time: Instant,
    /// Absent when no Prometheus recorder is installed (tests)
    pub metrics: Option<PrometheusHandle>,
}

/// Build the API router
pub fn router(service: DocumentService, metrics: Option<PrometheusHandle>) -> Router {
    let api_prefix = service.config.server.api_prefix.clone();
    let max_body_size =
        service.config.limits.max_file_size_bytes as usize + MULTIPART_OVERHEAD_BYTES;

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
        metrics,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Document endpoints - with larger body limit for file uploads
        .route(
            "/upload",
            post(upload_document_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/extract", post(extract_handler))
        .route("/batch-process", post(batch_process_handler))
        .route("/documents", get(list_documents_handler))
        .route("/documents/{id}", get(get_document_handler))
        .route("/documents/{id}/text", get(get_document_text_handler))
        .route("/documents/{id}/entities", get(get_document_entities_handler))
        .route("/documents/{id}/download", get(download_document_handler))
        // Raw-text analysis
        .route("/classify", post(classify_handler))
        .route("/extract-entities", post(extract_entities_handler))
        .route("/health", get(health_handler));

    Router::new()
        .route("/metrics", get(metrics_handler))
        .nest(&api_prefix, api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model_available = state.service.ai.model_available().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.service.config.server.project_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        documents: state.service.store.len(),
        model_available,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
    uptime_seconds: u64,
    documents: usize,
    model_available: bool,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

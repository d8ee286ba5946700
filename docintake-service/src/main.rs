use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::info;

mod analysis;
mod api;
mod config;
mod error;
mod ingestion;
mod models;
mod ocr;
mod ollama;
mod service;
mod store;

use crate::config::AppConfig;
use crate::service::DocumentService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!(
        "Starting document intake service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = AppConfig::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        prefix = %config.server.api_prefix,
        upload_dir = %config.storage.upload_dir.display(),
        "Configuration loaded"
    );

    // Ensure upload directory exists
    std::fs::create_dir_all(&config.storage.upload_dir)?;

    // Install the Prometheus recorder before any metric is touched
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Initialize the service
    let service = DocumentService::new(config)?;

    // Build the router
    let app = api::router(service, Some(metrics_handle));

    // Start the server
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!("documents_uploaded_total", "Uploads accepted and stored");
    metrics::describe_counter!(
        "documents_processed_total",
        "Processing runs by final status"
    );
    metrics::describe_counter!("ocr_pages_total", "Pages or images passed to the OCR engine");
    metrics::describe_histogram!(
        "document_processing_seconds",
        metrics::Unit::Seconds,
        "Wall time of one processing run"
    );
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("docintake_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}

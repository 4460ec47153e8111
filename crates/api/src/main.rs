mod config;
mod error;
mod metrics;
mod pipeline;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderName, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use extract::{ApiKey, Extractor, GeminiClient, ModelClient};
use ingest::Document;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use config::AppConfig;
use error::AppError;
use metrics::{Metrics, MetricsSnapshot};
use pipeline::{DOWNLOAD_FILE_NAME, Workbook};

struct AppState<C> {
    extractor: Extractor<C>,
    metrics: Arc<Metrics>,
    model: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
}

#[derive(Deserialize)]
struct PathRequest {
    path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().json().init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    // Nothing can be extracted without a key, so refuse to start
    let api_key = load_credential(|name| std::env::var(name).ok())?;

    let client = GeminiClient::new(&config.llm, api_key).context("Failed to build model client")?;
    let state = Arc::new(AppState {
        model: client.model().to_string(),
        extractor: Extractor::new(client, config.readiness_policy()),
        metrics: Metrics::new(),
    });

    let app = router(state, config.server.max_upload_mb * 1024 * 1024);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    info!(addr = %config.server.bind_addr, model = %config.llm.model, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

fn load_credential<F>(lookup: F) -> anyhow::Result<ApiKey>
where
    F: Fn(&str) -> Option<String>,
{
    ApiKey::from_lookup(lookup).context("Missing API credential")
}

fn router<C: ModelClient + 'static>(state: Arc<AppState<C>>, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(health_check::<C>).post(health_check::<C>))
        .route("/extract", post(extract_upload::<C>))
        .route("/extract/path", post(extract_path::<C>))
        .route("/stats", get(get_stats::<C>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

async fn health_check<C: ModelClient>(State(state): State<Arc<AppState<C>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.model.clone(),
    })
}

async fn get_stats<C: ModelClient>(State(state): State<Arc<AppState<C>>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Every file field of the form becomes one document
async fn extract_upload<C: ModelClient>(
    State(state): State<Arc<AppState<C>>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut documents = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(AppError::input)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(AppError::input)?;
        documents.push(Document::new(file_name, bytes.to_vec()).map_err(AppError::input)?);
    }

    if documents.is_empty() {
        return Err(AppError::input("no files were uploaded"));
    }

    let workbook = pipeline::run(&state.extractor, &state.metrics, &documents).await?;
    Ok(download(workbook))
}

/// Reads a document or a directory of documents from the server's filesystem
async fn extract_path<C: ModelClient>(
    State(state): State<Arc<AppState<C>>>,
    Json(req): Json<PathRequest>,
) -> Result<Response, AppError> {
    let path = PathBuf::from(&req.path);
    let documents = ingest::ingest_path(&path)
        .await
        .map_err(|e| AppError::Input(format!("{:#}", e)))?;

    let workbook = pipeline::run(&state.extractor, &state.metrics, &documents).await?;
    Ok(download(workbook))
}

fn download(workbook: Workbook) -> Response {
    let headers = [
        (header::CONTENT_TYPE, layout::XLSX_MIME.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
        ),
        (HeaderName::from_static("x-run-id"), workbook.run_id.to_string()),
        (HeaderName::from_static("x-shareholders"), workbook.shareholders.to_string()),
        (HeaderName::from_static("x-sheet-width"), workbook.width.to_string()),
    ];

    (headers, workbook.bytes).into_response()
}

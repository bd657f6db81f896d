//! REST API for document formatting jobs
//!
//! Clients upload DOCX/PDF files, poll the job, then download the formatted
//! documents one by one or as a zip archive.

mod error;
mod handlers;
pub mod logging;
mod types;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use docform::{Config, InMemoryJobRegistry, JobRegistry, JobStorage, Pipeline};

pub use error::ApiError;
pub use handlers::*;
pub use types::*;

/// Default request body limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// API server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn JobRegistry>,
    pub storage: Arc<JobStorage>,
    pub pipeline: Arc<Pipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// State with an empty in-memory registry over the given storage.
    pub fn new(storage: JobStorage) -> Self {
        Self {
            registry: Arc::new(InMemoryJobRegistry::new()),
            pipeline: Arc::new(Pipeline::new(storage.clone())),
            storage: Arc::new(storage),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Builds the state from configuration, creating the storage roots.
    pub fn from_config(config: &Config) -> docform::Result<Self> {
        let storage = JobStorage::new(config.upload_root(), config.output_root());
        storage.ensure_roots()?;

        let mut state = Self::new(storage);
        state.max_upload_bytes = config.max_upload_bytes;
        Ok(state)
    }
}

/// Build the API router with all endpoints
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        // Health check
        .route("/", get(health_check))
        // Intake
        .route("/upload-files/", post(upload_files))
        .route("/upload-files", post(upload_files))
        // Status and results
        .route("/job-status/{job_id}", get(job_status))
        .route("/download/{job_id}/{filename}", get(download_file))
        .route("/download-all/{job_id}", get(download_all))
        .route("/job/{job_id}", delete(delete_job))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves on an already bound listener until the task is dropped.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, build_router(state)).await
}

/// Start the API server and stop gracefully on Ctrl-C.
pub async fn start_server(addr: &str, state: AppState) -> std::io::Result<()> {
    tracing::info!("Starting API server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

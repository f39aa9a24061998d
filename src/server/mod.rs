// HTTP server - router wiring and shared handler state

pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;

use crate::downloader::{ExtractionEngine, JobOrchestrator, JobRegistry};

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn ExtractionEngine>,
    pub orchestrator: JobOrchestrator,
    pub registry: JobRegistry,
    pub started: Instant,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/extract", post(routes::extract))
        .route("/download", post(routes::download))
        .route("/job/{job_id}", get(routes::job_status))
        .route("/files/{filename}", get(routes::serve_file))
        .route("/health", get(routes::health))
        .with_state(state)
}

// Server entrypoint - wiring, logging, background reaper, HTTP loop

use std::sync::Arc;
use std::time::Instant;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

use mediagrab_backend::config::Config;
use mediagrab_backend::downloader::ffmpeg::FfmpegMerger;
use mediagrab_backend::downloader::utils::tool_version;
use mediagrab_backend::downloader::ytdlp::YtDlpEngine;
use mediagrab_backend::downloader::{JobOrchestrator, JobRegistry, RetentionReaper};
use mediagrab_backend::server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Arc::new(Config::from_env());
    std::fs::create_dir_all(config.jobs_dir())?;
    std::fs::create_dir_all(config.merged_dir())?;

    let engine = Arc::new(YtDlpEngine::new(&config));
    let merger = Arc::new(FfmpegMerger::new());
    log_tool(engine.binary_path());
    log_tool(merger.binary_path());

    let registry = JobRegistry::new();
    let orchestrator = JobOrchestrator::new(
        config.clone(),
        registry.clone(),
        engine.clone(),
        merger,
    );

    tokio::spawn(RetentionReaper::new(registry.clone(), config.clone()).run());

    let state = AppState {
        engine,
        orchestrator,
        registry,
        started: Instant::now(),
    };
    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "mediagrab backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn log_tool(path: &str) {
    match tool_version(path) {
        Some(version) => {
            tracing::info!(tool = path, version = %version, "external tool available");
        }
        None => {
            tracing::warn!(tool = path, "external tool missing; jobs needing it will fail");
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
    }
}

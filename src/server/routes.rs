// Request handlers for the acquisition API
//
// Job outcomes are reported as data, never as HTTP error codes: a failed
// acquisition still answers `GET /job/{id}` with 200 and status "error".
// HTTP errors are reserved for request validation and unknown resources.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::io::ReaderStream;

use crate::downloader::{Job, MediaKind};

use super::AppState;

/// Client-visible request failures.
#[derive(Debug)]
pub enum ApiError {
    /// Request body lacked a usable `url`.
    MissingUrl,
    /// Unknown job id.
    UnknownJob,
    /// Filename not owned by any done job (or already reaped).
    Expired,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::MissingUrl => (StatusCode::BAD_REQUEST, json!({"status": "error"})),
            Self::UnknownJob => (StatusCode::NOT_FOUND, json!({"status": "error"})),
            Self::Expired => (StatusCode::NOT_FOUND, json!({"status": "expired"})),
            Self::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"status": "error", "error": message}),
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
pub struct ExtractRequest {
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub status: &'static str,
    pub title: String,
    pub thumbnail: String,
    pub duration: Option<f64>,
    pub uploader: String,
    pub formats: Vec<FormatSummary>,
}

#[derive(Serialize)]
pub struct FormatSummary {
    pub height: Option<u32>,
    pub filesize: Option<u64>,
    pub has_video: bool,
    pub has_audio: bool,
}

#[derive(Deserialize)]
pub struct DownloadRequest {
    pub url: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: MediaKind,
    #[serde(default = "default_quality")]
    pub quality: u32,
}

fn default_quality() -> u32 {
    1080
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub status: &'static str,
    pub job_id: String,
}

fn required_url(url: Option<String>) -> Result<String, ApiError> {
    match url {
        Some(url) if !url.trim().is_empty() => Ok(url),
        _ => Err(ApiError::MissingUrl),
    }
}

/// `POST /extract` - probe a URL without downloading anything.
pub async fn extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let url = required_url(request.url)?;

    let metadata = state
        .engine
        .probe(&url)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let formats = metadata
        .candidates
        .iter()
        .map(|c| FormatSummary {
            height: c.height,
            filesize: c.effective_size(),
            has_video: c.has_video,
            has_audio: c.has_audio,
        })
        .collect();

    Ok(Json(ExtractResponse {
        status: "ok",
        title: metadata.title,
        thumbnail: metadata.thumbnail,
        duration: metadata.duration,
        uploader: metadata.uploader,
        formats,
    }))
}

/// `POST /download` - create a job and return its id immediately.
pub async fn download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let url = required_url(request.url)?;

    let job_id = state
        .orchestrator
        .submit(url, request.kind, request.quality)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(Json(DownloadResponse {
        status: "ok",
        job_id,
    }))
}

/// `GET /job/{job_id}` - poll one job's lifecycle record.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state.registry.get(&job_id).map(Json).ok_or(ApiError::UnknownJob)
}

/// `GET /files/{filename}` - stream a finished artifact as an attachment.
///
/// The file can be reaped between lookup and open; that window surfaces
/// as the same expired response, never a crash.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let job = state
        .registry
        .find_done_by_filename(&filename)
        .ok_or(ApiError::Expired)?;
    let path = job.artifact_path.ok_or(ApiError::Expired)?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::Expired)?;
    let size = file
        .metadata()
        .await
        .map_err(|_| ApiError::Expired)?
        .len();

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&path)),
    );
    if let Ok(length) = HeaderValue::from_str(&size.to_string()) {
        headers.insert(header::CONTENT_LENGTH, length);
    }
    headers.insert(header::CONTENT_DISPOSITION, attachment_header(&filename, &path));

    Ok(response)
}

/// `GET /health` - liveness probe with process uptime in seconds.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "uptime": state.started.elapsed().as_secs(),
    }))
}

fn content_type_for(path: &FsPath) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("m4a") => "audio/mp4",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Suggest the display name; fall back to the on-disk (job-id) name when
/// the title is not representable in a header value.
fn attachment_header(display_name: &str, path: &FsPath) -> HeaderValue {
    HeaderValue::from_str(&format!("attachment; filename=\"{display_name}\""))
        .or_else(|_| {
            let on_disk = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("download");
            HeaderValue::from_str(&format!("attachment; filename=\"{on_disk}\""))
        })
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

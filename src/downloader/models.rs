// Common data models for the acquisition pipeline

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What the client asked to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Both,
}

impl Default for MediaKind {
    fn default() -> Self {
        Self::Both
    }
}

/// Lifecycle state of one job.
///
/// "downloading" is the in-progress wire name clients poll against.
/// Transitions are one-way; a terminal state is never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Downloading,
    Done,
    Error,
}

/// One asynchronous acquisition request and its lifecycle record.
///
/// The serialized shape is exactly what `GET /job/{id}` returns: all five
/// public fields are always present, null until set. `artifact_path` and
/// `terminal_at` are internal bookkeeping and never leave the process.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub status: JobStatus,
    /// Display filename, set only when done.
    pub filename: Option<String>,
    /// Artifact size in bytes, set only when done.
    pub size: Option<u64>,
    /// Completion time (unix seconds), set only when done. Anchors the
    /// retention window.
    pub created_at: Option<i64>,
    /// Failure message, set only on error.
    pub error: Option<String>,

    /// Job-id-namespaced file actually on disk.
    #[serde(skip)]
    pub artifact_path: Option<PathBuf>,
    /// When the job reached a terminal state; ages error jobs.
    #[serde(skip)]
    pub terminal_at: Option<i64>,
}

impl Job {
    pub fn downloading() -> Self {
        Self {
            status: JobStatus::Downloading,
            filename: None,
            size: None,
            created_at: None,
            error: None,
            artifact_path: None,
            terminal_at: None,
        }
    }
}

/// One externally reported fetchable stream for a URL.
///
/// Read-only and ephemeral; lives only for the duration of one
/// acquisition attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStream {
    /// Engine-native handle, used to fetch exactly this stream.
    pub format_id: String,
    /// Vertical resolution in pixels, when the engine reports one.
    pub height: Option<u32>,
    /// Exact byte size.
    pub filesize: Option<u64>,
    /// Engine estimate, used when the exact size is unknown.
    pub filesize_approx: Option<u64>,
    pub has_video: bool,
    pub has_audio: bool,
}

impl CandidateStream {
    /// Effective byte size: exact first, estimate second.
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

/// Output of the format selector, consumed immediately by the executor.
#[derive(Debug, Clone, Default)]
pub struct SelectionPlan {
    pub video: Option<CandidateStream>,
    pub audio: Option<CandidateStream>,
}

/// Descriptive metadata plus the candidate stream list for a URL.
#[derive(Debug, Clone)]
pub struct MediaMetadata {
    pub title: String,
    pub thumbnail: String,
    pub duration: Option<f64>,
    pub uploader: String,
    pub candidates: Vec<CandidateStream>,
}

/// A finished, downloadable output file.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Human-facing name suggested to the downloader.
    pub display_name: String,
    /// Where the bytes actually live (namespaced by job id).
    pub path: PathBuf,
    pub size: u64,
}

// Error types for the acquisition pipeline

use thiserror::Error;

/// Aggregated failure for one acquisition attempt.
///
/// Whatever stage fails (metadata probe, selection, fetch, merge), the
/// worker records a single terminal error on the job; nothing here is
/// ever surfaced as an HTTP error code.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Metadata extraction for the URL failed.
    #[error("metadata extraction failed: {0}")]
    Probe(String),

    /// Extractor produced output we could not parse.
    #[error("failed to parse extractor output: {0}")]
    Parse(String),

    /// Selection yielded no stream where one was required.
    #[error("no usable {0} stream found")]
    NoUsableStream(&'static str),

    /// Network fetch of a stream failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Combining the video and audio tracks failed.
    #[error("merge failed: {0}")]
    Merge(String),

    /// The whole acquisition ran past its deadline.
    #[error("acquisition timed out after {0}s")]
    Timeout(u64),

    /// yt-dlp or ffmpeg missing from the system.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Worker infrastructure failure (panic, join error).
    #[error("internal error: {0}")]
    Internal(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

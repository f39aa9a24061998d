// Shared test doubles for the acquisition pipeline

use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::errors::AcquisitionError;
use super::models::{CandidateStream, MediaMetadata};
use super::traits::{ExtractionEngine, FetchRequest, StreamMerger};

pub(crate) fn video_stream(format_id: &str, height: u32, filesize: u64) -> CandidateStream {
    CandidateStream {
        format_id: format_id.to_string(),
        height: Some(height),
        filesize: Some(filesize),
        filesize_approx: None,
        has_video: true,
        has_audio: false,
    }
}

pub(crate) fn audio_stream(format_id: &str, filesize: u64) -> CandidateStream {
    CandidateStream {
        format_id: format_id.to_string(),
        height: None,
        filesize: Some(filesize),
        filesize_approx: None,
        has_video: false,
        has_audio: true,
    }
}

/// Engine double: probes canned candidates and materializes fetches as
/// small files in the requested working directory.
#[derive(Default)]
pub(crate) struct StubEngine {
    pub candidates: Vec<CandidateStream>,
    pub fail_fetch: bool,
    pub fetch_delay: Option<Duration>,
    pub fetches: Mutex<Vec<FetchRequest>>,
}

impl StubEngine {
    pub fn with_candidates(candidates: Vec<CandidateStream>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ExtractionEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub-engine"
    }

    async fn probe(&self, url: &str) -> Result<MediaMetadata, AcquisitionError> {
        let tail = url.rsplit('/').next().unwrap_or("clip");
        Ok(MediaMetadata {
            title: format!("clip {tail}"),
            thumbnail: String::new(),
            duration: Some(10.0),
            uploader: "tester".to_string(),
            candidates: self.candidates.clone(),
        })
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<(), AcquisitionError> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_fetch {
            return Err(AcquisitionError::Fetch("stub fetch failure".to_string()));
        }

        self.fetches.lock().push(request.clone());

        let ext = if request.extract_audio {
            "mp3"
        } else if request.output_template.starts_with("audio") {
            "m4a"
        } else {
            "mp4"
        };
        let name = request.output_template.replace("%(ext)s", ext);
        std::fs::write(request.dest_dir.join(name), b"stub-bytes")?;
        Ok(())
    }
}

/// Merger double: counts invocations and writes a placeholder output.
#[derive(Default)]
pub(crate) struct StubMerger {
    pub calls: AtomicUsize,
}

#[async_trait]
impl StreamMerger for StubMerger {
    fn name(&self) -> &'static str {
        "stub-merger"
    }

    async fn merge(
        &self,
        _video: &Path,
        _audio: &Path,
        output: &Path,
    ) -> Result<(), AcquisitionError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        std::fs::write(output, b"merged-bytes")?;
        Ok(())
    }
}

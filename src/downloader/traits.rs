// Extraction engine and merger trait definitions

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::errors::AcquisitionError;
use super::models::MediaMetadata;
use super::platform::Platform;

/// One fetch the engine should perform into a job's working directory.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// Engine format expression or a concrete format id.
    pub format_spec: String,
    /// Working directory the output lands in.
    pub dest_dir: PathBuf,
    /// Output template, e.g. `video.%(ext)s`.
    pub output_template: String,
    pub platform: Platform,
    /// Ask the engine to merge video+audio server-side into this container.
    pub merge_container: Option<&'static str>,
    /// Remux a single stream into this container after download.
    pub remux_container: Option<&'static str>,
    /// Extract audio to mp3 @ 192k with embedded thumbnail and tags.
    pub extract_audio: bool,
}

impl FetchRequest {
    pub fn new(url: &str, format_spec: impl Into<String>, dest_dir: &Path) -> Self {
        Self {
            url: url.to_string(),
            format_spec: format_spec.into(),
            dest_dir: dest_dir.to_path_buf(),
            output_template: "media.%(ext)s".to_string(),
            platform: Platform::classify(url),
            merge_container: None,
            remux_container: None,
            extract_audio: false,
        }
    }

    pub fn output_template(mut self, template: &str) -> Self {
        self.output_template = template.to_string();
        self
    }

    pub fn merge_into(mut self, container: &'static str) -> Self {
        self.merge_container = Some(container);
        self
    }

    pub fn remux_into(mut self, container: &'static str) -> Self {
        self.remux_container = Some(container);
        self
    }

    pub fn extract_audio(mut self) -> Self {
        self.extract_audio = true;
        self
    }
}

/// The opaque stream-metadata and fetch engine (yt-dlp in production).
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Name of the engine (for logging).
    fn name(&self) -> &'static str;

    /// Fetch title and candidate streams for a URL without downloading.
    async fn probe(&self, url: &str) -> Result<MediaMetadata, AcquisitionError>;

    /// Download one stream (or an engine-merged pair) as requested.
    async fn fetch(&self, request: &FetchRequest) -> Result<(), AcquisitionError>;
}

/// The opaque remux/transcode operation (ffmpeg in production).
#[async_trait]
pub trait StreamMerger: Send + Sync {
    /// Name of the merger (for logging).
    fn name(&self) -> &'static str;

    /// Combine a video file and an audio file into one output container,
    /// copying the video stream and transcoding audio to AAC.
    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
    ) -> Result<(), AcquisitionError>;
}

// ffmpeg stream merger - combines split-fetched video and audio tracks

use std::path::Path;

use async_trait::async_trait;

use super::errors::AcquisitionError;
use super::traits::StreamMerger;
use super::utils::{find_tool, run_output_with_timeout, stderr_tail};

const MERGE_TIMEOUT_SECS: u64 = 30 * 60;

pub struct FfmpegMerger {
    path: String,
}

impl FfmpegMerger {
    pub fn new() -> Self {
        Self {
            path: find_tool("ffmpeg", "FFMPEG_PATH"),
        }
    }

    pub fn binary_path(&self) -> &str {
        &self.path
    }
}

impl Default for FfmpegMerger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamMerger for FfmpegMerger {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
    ) -> Result<(), AcquisitionError> {
        // Video elementary stream is copied untouched; only the audio
        // track is transcoded to the fixed AAC target.
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            video.to_string_lossy().into_owned(),
            "-i".to_string(),
            audio.to_string_lossy().into_owned(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
            output.to_string_lossy().into_owned(),
        ];

        let result = run_output_with_timeout(&self.path, args, MERGE_TIMEOUT_SECS)
            .await
            .map_err(AcquisitionError::Merge)?;

        if !result.status.success() {
            return Err(AcquisitionError::Merge(stderr_tail(&result.stderr, 3)));
        }
        if !output.exists() {
            return Err(AcquisitionError::Merge(format!(
                "ffmpeg reported success but {} is missing",
                output.display()
            )));
        }
        Ok(())
    }
}

// yt-dlp extraction engine - probes metadata and fetches streams
// by shelling out to the yt-dlp binary.

use async_trait::async_trait;

use crate::config::Config;

use super::errors::AcquisitionError;
use super::models::{CandidateStream, MediaMetadata};
use super::platform::Platform;
use super::traits::{ExtractionEngine, FetchRequest};
use super::utils::{find_tool, run_output_with_timeout, stderr_tail};

const PROBE_TIMEOUT_SECS: u64 = 30;

pub struct YtDlpEngine {
    path: String,
    config: Config,
    /// Per-invocation ceiling; the orchestrator's deadline is the real
    /// cancellation point, this only guards a wedged child process.
    fetch_timeout_secs: u64,
}

impl YtDlpEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            path: find_tool("yt-dlp", "YTDLP_PATH"),
            config: config.clone(),
            fetch_timeout_secs: config.acquire_deadline.as_secs().max(60),
        }
    }

    pub fn binary_path(&self) -> &str {
        &self.path
    }

    fn cookie_args(&self, platform: Platform) -> Vec<String> {
        match self.config.cookie_file_for(platform) {
            Some(path) => vec!["--cookies".to_string(), path.to_string_lossy().into_owned()],
            None => Vec::new(),
        }
    }

    fn build_probe_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificates".to_string(),
            "--socket-timeout".to_string(),
            "15".to_string(),
            "--retries".to_string(),
            "2".to_string(),
        ];
        args.extend(self.cookie_args(Platform::classify(url)));
        args.push(url.to_string());
        args
    }

    fn build_fetch_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            request.format_spec.clone(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificates".to_string(),
            "--socket-timeout".to_string(),
            "30".to_string(),
            "--retries".to_string(),
            "5".to_string(),
            "-P".to_string(),
            request.dest_dir.to_string_lossy().into_owned(),
            "-o".to_string(),
            request.output_template.clone(),
        ];

        if let Some(container) = request.merge_container {
            args.push("--merge-output-format".to_string());
            args.push(container.to_string());
        }
        if let Some(container) = request.remux_container {
            args.push("--remux-video".to_string());
            args.push(container.to_string());
        }
        if request.extract_audio {
            // Mirrors the postprocessor chain the service always used:
            // mp3 @ 192k with an embedded jpg thumbnail and metadata tags.
            args.extend(
                [
                    "-x",
                    "--audio-format",
                    "mp3",
                    "--audio-quality",
                    "192",
                    "--write-thumbnail",
                    "--convert-thumbnails",
                    "jpg",
                    "--embed-thumbnail",
                    "--embed-metadata",
                ]
                .map(str::to_string),
            );
        }

        args.extend(self.cookie_args(request.platform));
        args.push(request.url.clone());
        args
    }

    fn parse_metadata(stdout: &[u8]) -> Result<MediaMetadata, AcquisitionError> {
        let json_str = String::from_utf8_lossy(stdout);
        let json: serde_json::Value = serde_json::from_str(&json_str)
            .map_err(|e| AcquisitionError::Parse(format!("invalid JSON: {}", e)))?;

        let candidates = json["formats"]
            .as_array()
            .map(|formats| formats.iter().map(parse_candidate).collect())
            .unwrap_or_default();

        Ok(MediaMetadata {
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            thumbnail: json["thumbnail"].as_str().unwrap_or("").to_string(),
            duration: json["duration"].as_f64(),
            uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
            candidates,
        })
    }

    fn classify_failure(detail: String) -> AcquisitionError {
        if detail.contains("not found") || detail.contains("No such file") {
            AcquisitionError::ToolNotFound(detail)
        } else {
            AcquisitionError::Fetch(detail)
        }
    }
}

fn parse_candidate(f: &serde_json::Value) -> CandidateStream {
    let codec_present = |key: &str| f[key].as_str().is_some_and(|c| c != "none" && !c.is_empty());

    CandidateStream {
        format_id: f["format_id"].as_str().unwrap_or("").to_string(),
        height: f["height"].as_u64().map(|h| h as u32),
        filesize: f["filesize"].as_u64(),
        filesize_approx: f["filesize_approx"].as_u64(),
        has_video: codec_present("vcodec"),
        has_audio: codec_present("acodec"),
    }
}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<MediaMetadata, AcquisitionError> {
        let args = self.build_probe_args(url);
        let output = run_output_with_timeout(&self.path, args, PROBE_TIMEOUT_SECS)
            .await
            .map_err(AcquisitionError::Probe)?;

        if !output.status.success() {
            return Err(AcquisitionError::Probe(stderr_tail(&output.stderr, 3)));
        }
        Self::parse_metadata(&output.stdout)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<(), AcquisitionError> {
        tracing::debug!(
            engine = self.name(),
            format = %request.format_spec,
            template = %request.output_template,
            "starting fetch"
        );

        let args = self.build_fetch_args(request);
        let output = run_output_with_timeout(&self.path, args, self.fetch_timeout_secs)
            .await
            .map_err(Self::classify_failure)?;

        if !output.status.success() {
            return Err(AcquisitionError::Fetch(stderr_tail(&output.stderr, 3)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "title": "A Clip",
        "thumbnail": "https://i.example/th.jpg",
        "duration": 212.5,
        "uploader": "someone",
        "formats": [
            {"format_id": "137", "height": 1080, "filesize": 90000000,
             "vcodec": "avc1.640028", "acodec": "none"},
            {"format_id": "140", "filesize_approx": 3400000,
             "vcodec": "none", "acodec": "mp4a.40.2"},
            {"format_id": "sb0", "height": 1080, "vcodec": null, "acodec": null}
        ]
    }"#;

    #[test]
    fn parses_metadata_and_candidates() {
        let meta = YtDlpEngine::parse_metadata(SAMPLE_JSON.as_bytes()).unwrap();
        assert_eq!(meta.title, "A Clip");
        assert_eq!(meta.uploader, "someone");
        assert_eq!(meta.duration, Some(212.5));
        assert_eq!(meta.candidates.len(), 3);

        let video = &meta.candidates[0];
        assert!(video.has_video);
        assert!(!video.has_audio);
        assert_eq!(video.effective_size(), Some(90_000_000));

        let audio = &meta.candidates[1];
        assert!(audio.has_audio);
        assert!(!audio.has_video);
        assert_eq!(audio.effective_size(), Some(3_400_000));

        // Null codecs are treated as absent, not present.
        let storyboard = &meta.candidates[2];
        assert!(!storyboard.has_video);
        assert!(!storyboard.has_audio);
    }

    #[test]
    fn rejects_non_json_output() {
        assert!(matches!(
            YtDlpEngine::parse_metadata(b"ERROR: nope"),
            Err(AcquisitionError::Parse(_))
        ));
    }

    #[test]
    fn fetch_args_carry_the_requested_postprocessing() {
        let engine = YtDlpEngine::new(&Config::default());
        let request = FetchRequest::new(
            "https://www.youtube.com/watch?v=abc",
            "bestaudio/best",
            std::path::Path::new("/tmp/job"),
        )
        .output_template("audio.%(ext)s")
        .extract_audio();

        let args = engine.build_fetch_args(&request);
        assert!(args.contains(&"-x".to_string()));
        assert!(args.contains(&"mp3".to_string()));
        assert!(args.contains(&"--embed-thumbnail".to_string()));
        assert!(args.contains(&"audio.%(ext)s".to_string()));
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=abc");

        let request = FetchRequest::new(
            "https://www.youtube.com/watch?v=abc",
            "bestvideo[height<=1080]+bestaudio/best",
            std::path::Path::new("/tmp/job"),
        )
        .merge_into("mp4");
        let args = engine.build_fetch_args(&request);
        assert!(args.contains(&"--merge-output-format".to_string()));
        assert!(args.contains(&"mp4".to_string()));
        assert!(!args.contains(&"-x".to_string()));
    }
}

// Acquisition executor - turns a selection plan into one output artifact
//
// Branches on platform classification and requested kind:
// - short-form content: single engine-merged fetch, ceiling ignored
// - audio: engine-side mp3 extraction with thumbnail/metadata embedding
// - video: direct fetch of the selected stream, remuxed to mp4
// - both: split fetch + local merge when a plausible pair was selected,
//   otherwise a single-pass engine-merged fetch

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::errors::AcquisitionError;
use super::models::{Artifact, MediaKind, SelectionPlan};
use super::platform::Platform;
use super::traits::{ExtractionEngine, FetchRequest, StreamMerger};
use super::utils::safe_filename;

pub struct AcquisitionExecutor {
    engine: Arc<dyn ExtractionEngine>,
    merger: Arc<dyn StreamMerger>,
    /// Shared flat directory finished artifacts are published into.
    output_dir: PathBuf,
}

impl AcquisitionExecutor {
    pub fn new(
        engine: Arc<dyn ExtractionEngine>,
        merger: Arc<dyn StreamMerger>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            engine,
            merger,
            output_dir,
        }
    }

    /// Run the acquisition branch for one job. Everything intermediate
    /// stays inside `job_dir`; only the final artifact leaves it.
    pub async fn execute(
        &self,
        job_id: &str,
        url: &str,
        kind: MediaKind,
        quality_ceiling: u32,
        plan: &SelectionPlan,
        title: &str,
        job_dir: &Path,
    ) -> Result<Artifact, AcquisitionError> {
        let platform = Platform::classify(url);

        let produced = if platform.is_short_form() {
            self.fetch_short_form(url, job_dir).await?
        } else {
            match kind {
                MediaKind::Audio => self.fetch_audio(url, job_dir).await?,
                MediaKind::Video => self.fetch_video(url, plan, job_dir).await?,
                MediaKind::Both => match (&plan.video, &plan.audio) {
                    (Some(video), Some(audio)) => {
                        self.fetch_split(url, &video.format_id, &audio.format_id, job_dir)
                            .await?
                    }
                    _ => self.fetch_combined(url, quality_ceiling, job_dir).await?,
                },
            }
        };

        self.publish(job_id, title, &produced).await
    }

    /// Short-form content is always one best combined stream, merged by
    /// the engine itself; ceiling and type splitting do not apply.
    async fn fetch_short_form(&self, url: &str, job_dir: &Path) -> Result<PathBuf, AcquisitionError> {
        let request = FetchRequest::new(url, "bv*+ba/b", job_dir)
            .output_template("short.%(ext)s")
            .merge_into("mp4");
        self.engine.fetch(&request).await?;
        locate_by_stem(job_dir, "short").await
    }

    async fn fetch_audio(&self, url: &str, job_dir: &Path) -> Result<PathBuf, AcquisitionError> {
        let request = FetchRequest::new(url, "bestaudio/best", job_dir)
            .output_template("audio.%(ext)s")
            .extract_audio();
        self.engine.fetch(&request).await?;
        // The extractor leaves companion files (thumbnails) next to the
        // track, so locate the mp3 by extension.
        locate_by_ext(job_dir, "mp3").await
    }

    async fn fetch_video(
        &self,
        url: &str,
        plan: &SelectionPlan,
        job_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        let video = plan
            .video
            .as_ref()
            .ok_or(AcquisitionError::NoUsableStream("video"))?;

        let request = FetchRequest::new(url, video.format_id.clone(), job_dir)
            .output_template("video.%(ext)s")
            .remux_into("mp4");
        self.engine.fetch(&request).await?;
        locate_by_stem(job_dir, "video").await
    }

    /// Fetch the chosen video and audio streams independently, then merge
    /// locally (video copied, audio transcoded).
    async fn fetch_split(
        &self,
        url: &str,
        video_format: &str,
        audio_format: &str,
        job_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        let video_req = FetchRequest::new(url, video_format.to_string(), job_dir)
            .output_template("video.%(ext)s");
        self.engine.fetch(&video_req).await?;
        let video_path = locate_by_stem(job_dir, "video").await?;

        let audio_req = FetchRequest::new(url, audio_format.to_string(), job_dir)
            .output_template("audio.%(ext)s");
        self.engine.fetch(&audio_req).await?;
        let audio_path = locate_by_stem(job_dir, "audio").await?;

        let merged = job_dir.join("merged.mp4");
        self.merger.merge(&video_path, &audio_path, &merged).await?;
        Ok(merged)
    }

    /// Single-pass fallback: let the engine pick and merge server-side.
    async fn fetch_combined(
        &self,
        url: &str,
        quality_ceiling: u32,
        job_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        let spec = format!("bestvideo[height<={quality_ceiling}]+bestaudio/best");
        let request = FetchRequest::new(url, spec, job_dir)
            .output_template("combined.%(ext)s")
            .merge_into("mp4");
        self.engine.fetch(&request).await?;
        locate_by_stem(job_dir, "combined").await
    }

    /// Move the produced file into the shared output directory under a
    /// job-id-namespaced name; the sanitized title is only the suggested
    /// download name, so same-titled jobs cannot clobber each other.
    async fn publish(
        &self,
        job_id: &str,
        title: &str,
        produced: &Path,
    ) -> Result<Artifact, AcquisitionError> {
        let ext = produced
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4")
            .to_string();

        let sanitized = safe_filename(title);
        let base = if sanitized.is_empty() {
            job_id
        } else {
            sanitized.as_str()
        };
        let display_name = format!("{base}.{ext}");

        let dest = self.output_dir.join(format!("{job_id}.{ext}"));
        tokio::fs::rename(produced, &dest).await?;
        let size = tokio::fs::metadata(&dest).await?.len();

        Ok(Artifact {
            display_name,
            path: dest,
            size,
        })
    }
}

async fn locate_by_stem(dir: &Path, stem: &str) -> Result<PathBuf, AcquisitionError> {
    locate(dir, |path| {
        path.file_stem().and_then(|s| s.to_str()) == Some(stem)
    })
    .await
    .ok_or_else(|| {
        AcquisitionError::Fetch(format!(
            "engine produced no {stem}.* output in {}",
            dir.display()
        ))
    })
}

async fn locate_by_ext(dir: &Path, ext: &str) -> Result<PathBuf, AcquisitionError> {
    locate(dir, |path| {
        path.extension().and_then(|e| e.to_str()) == Some(ext)
    })
    .await
    .ok_or_else(|| {
        AcquisitionError::Fetch(format!(
            "engine produced no .{ext} output in {}",
            dir.display()
        ))
    })
}

async fn locate(dir: &Path, matches: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.is_file() && matches(&path) {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::testing::{audio_stream, video_stream, StubEngine, StubMerger};
    use std::sync::atomic::Ordering;

    fn executor_with(
        engine: Arc<StubEngine>,
        merger: Arc<StubMerger>,
        out: &Path,
    ) -> AcquisitionExecutor {
        AcquisitionExecutor::new(engine, merger, out.to_path_buf())
    }

    fn dirs(tmp: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        let job_dir = tmp.path().join("job");
        let out_dir = tmp.path().join("merged");
        std::fs::create_dir_all(&job_dir).unwrap();
        std::fs::create_dir_all(&out_dir).unwrap();
        (job_dir, out_dir)
    }

    #[tokio::test]
    async fn audio_branch_extracts_mp3_under_display_title() {
        let tmp = tempfile::tempdir().unwrap();
        let (job_dir, out_dir) = dirs(&tmp);
        let engine = Arc::new(StubEngine::default());
        let merger = Arc::new(StubMerger::default());
        let executor = executor_with(engine.clone(), merger, &out_dir);

        let artifact = executor
            .execute(
                "job-1",
                "https://example.com/watch?v=1",
                MediaKind::Audio,
                1080,
                &SelectionPlan::default(),
                "My Song",
                &job_dir,
            )
            .await
            .unwrap();

        assert_eq!(artifact.display_name, "My Song.mp3");
        assert_eq!(artifact.path, out_dir.join("job-1.mp3"));
        assert!(artifact.path.exists());
        let fetches = engine.fetches.lock();
        assert!(fetches[0].extract_audio);
        assert_eq!(fetches[0].format_spec, "bestaudio/best");
    }

    #[tokio::test]
    async fn video_branch_requires_a_selected_stream() {
        let tmp = tempfile::tempdir().unwrap();
        let (job_dir, out_dir) = dirs(&tmp);
        let executor = executor_with(
            Arc::new(StubEngine::default()),
            Arc::new(StubMerger::default()),
            &out_dir,
        );

        let err = executor
            .execute(
                "job-2",
                "https://example.com/watch?v=2",
                MediaKind::Video,
                1080,
                &SelectionPlan::default(),
                "Clip",
                &job_dir,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::NoUsableStream("video")));
    }

    #[tokio::test]
    async fn split_branch_fetches_both_streams_and_merges() {
        let tmp = tempfile::tempdir().unwrap();
        let (job_dir, out_dir) = dirs(&tmp);
        let engine = Arc::new(StubEngine::default());
        let merger = Arc::new(StubMerger::default());
        let executor = executor_with(engine.clone(), merger.clone(), &out_dir);

        let plan = SelectionPlan {
            video: Some(video_stream("v137", 1080, 90_000_000)),
            audio: Some(audio_stream("a140", 4_000_000)),
        };
        let artifact = executor
            .execute(
                "job-3",
                "https://example.com/watch?v=3",
                MediaKind::Both,
                1080,
                &plan,
                r#"Na:me/With*Bad"Chars"#,
                &job_dir,
            )
            .await
            .unwrap();

        assert_eq!(merger.calls.load(Ordering::SeqCst), 1);
        let specs: Vec<String> = engine
            .fetches
            .lock()
            .iter()
            .map(|r| r.format_spec.clone())
            .collect();
        assert_eq!(specs, vec!["v137", "a140"]);
        assert_eq!(artifact.display_name, "NameWithBadChars.mp4");
        assert!(out_dir.join("job-3.mp4").exists());
    }

    #[tokio::test]
    async fn combined_falls_back_to_single_pass_without_a_pair() {
        let tmp = tempfile::tempdir().unwrap();
        let (job_dir, out_dir) = dirs(&tmp);
        let engine = Arc::new(StubEngine::default());
        let merger = Arc::new(StubMerger::default());
        let executor = executor_with(engine.clone(), merger.clone(), &out_dir);

        let plan = SelectionPlan {
            video: Some(video_stream("v137", 720, 50_000_000)),
            audio: None,
        };
        executor
            .execute(
                "job-4",
                "https://example.com/watch?v=4",
                MediaKind::Both,
                720,
                &plan,
                "Clip",
                &job_dir,
            )
            .await
            .unwrap();

        assert_eq!(merger.calls.load(Ordering::SeqCst), 0);
        let fetches = engine.fetches.lock();
        assert_eq!(
            fetches[0].format_spec,
            "bestvideo[height<=720]+bestaudio/best"
        );
        assert_eq!(fetches[0].merge_container, Some("mp4"));
    }

    #[tokio::test]
    async fn short_form_ignores_kind_and_ceiling() {
        let tmp = tempfile::tempdir().unwrap();
        let (job_dir, out_dir) = dirs(&tmp);
        let engine = Arc::new(StubEngine::default());
        let executor = executor_with(engine.clone(), Arc::new(StubMerger::default()), &out_dir);

        let artifact = executor
            .execute(
                "job-5",
                "https://www.youtube.com/shorts/xyz",
                MediaKind::Audio,
                360,
                &SelectionPlan::default(),
                "Short",
                &job_dir,
            )
            .await
            .unwrap();

        let fetches = engine.fetches.lock();
        assert_eq!(fetches[0].format_spec, "bv*+ba/b");
        assert!(!fetches[0].extract_audio);
        assert_eq!(artifact.display_name, "Short.mp4");
    }

    #[tokio::test]
    async fn unsafe_only_title_falls_back_to_job_id() {
        let tmp = tempfile::tempdir().unwrap();
        let (job_dir, out_dir) = dirs(&tmp);
        let executor = executor_with(
            Arc::new(StubEngine::default()),
            Arc::new(StubMerger::default()),
            &out_dir,
        );

        let artifact = executor
            .execute(
                "job-6",
                "https://example.com/watch?v=6",
                MediaKind::Audio,
                1080,
                &SelectionPlan::default(),
                r#"???"#,
                &job_dir,
            )
            .await
            .unwrap();
        assert_eq!(artifact.display_name, "job-6.mp3");
    }
}

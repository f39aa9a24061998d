// Job orchestrator - submission, detached workers, supervision

use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::Config;

use super::errors::AcquisitionError;
use super::executor::AcquisitionExecutor;
use super::format_selector;
use super::models::{Artifact, MediaKind};
use super::registry::JobRegistry;
use super::traits::{ExtractionEngine, StreamMerger};

/// Creates jobs and runs each one on a detached, supervised worker task.
///
/// `submit` returns before any acquisition work starts; callers observe
/// progress only by polling the registry. Workers are bounded by a
/// semaphore so a burst of submissions cannot run unlimited fetches at
/// once, and every worker ends in exactly one terminal registry write.
#[derive(Clone)]
pub struct JobOrchestrator {
    registry: JobRegistry,
    engine: Arc<dyn ExtractionEngine>,
    executor: Arc<AcquisitionExecutor>,
    config: Arc<Config>,
    permits: Arc<Semaphore>,
}

impl JobOrchestrator {
    pub fn new(
        config: Arc<Config>,
        registry: JobRegistry,
        engine: Arc<dyn ExtractionEngine>,
        merger: Arc<dyn StreamMerger>,
    ) -> Self {
        let executor = Arc::new(AcquisitionExecutor::new(
            engine.clone(),
            merger,
            config.merged_dir(),
        ));
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        Self {
            registry,
            engine,
            executor,
            config,
            permits,
        }
    }

    /// Create the job record and working directory, detach the worker,
    /// and hand back the job id immediately.
    pub fn submit(
        &self,
        url: String,
        kind: MediaKind,
        quality_ceiling: u32,
    ) -> std::io::Result<String> {
        let job_id = Uuid::new_v4().to_string();
        let job_dir = self.config.jobs_dir().join(&job_id);
        std::fs::create_dir_all(&job_dir)?;

        self.registry.create(&job_id);
        tracing::info!(job_id = %job_id, url = %url, ?kind, quality_ceiling, "job submitted");

        let this = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            // Closed only on shutdown; nothing left to record then.
            let _permit = match this.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let deadline = this.config.acquire_deadline;
            let pipeline =
                AssertUnwindSafe(this.run_pipeline(&id, &url, kind, quality_ceiling, job_dir))
                    .catch_unwind();

            let outcome = match tokio::time::timeout(deadline, pipeline).await {
                Err(_) => Err(AcquisitionError::Timeout(deadline.as_secs())),
                Ok(Err(_panic)) => Err(AcquisitionError::Internal(
                    "acquisition worker panicked".to_string(),
                )),
                Ok(Ok(result)) => result,
            };

            match outcome {
                Ok(artifact) => {
                    tracing::info!(
                        job_id = %id,
                        filename = %artifact.display_name,
                        size = artifact.size,
                        "job finished"
                    );
                    this.registry
                        .set_done(&id, artifact.display_name, artifact.path, artifact.size);
                }
                Err(err) => {
                    tracing::warn!(job_id = %id, error = %err, "job failed");
                    this.registry.set_error(&id, err.to_string());
                }
            }
        });

        Ok(job_id)
    }

    /// The strictly sequential per-job pipeline:
    /// metadata probe -> format selection -> acquisition.
    async fn run_pipeline(
        &self,
        job_id: &str,
        url: &str,
        kind: MediaKind,
        quality_ceiling: u32,
        job_dir: PathBuf,
    ) -> Result<Artifact, AcquisitionError> {
        let metadata = self.engine.probe(url).await?;
        let plan = format_selector::select(&metadata.candidates, kind, quality_ceiling);
        self.executor
            .execute(
                job_id,
                url,
                kind,
                quality_ceiling,
                &plan,
                &metadata.title,
                &job_dir,
            )
            .await
    }
}

// Retention reaper - purges expired jobs and their files

use std::sync::Arc;

use crate::config::Config;

use super::models::{Job, JobStatus};
use super::registry::JobRegistry;
use super::utils::now_unix;

/// Perpetual background loop that ages jobs out of the registry.
///
/// Done jobs age on `created_at` (completion time) against the file TTL;
/// error jobs age on `terminal_at` against their own, longer TTL so
/// clients get a window to poll the failure. In-progress jobs are never
/// purged by elapsed time. Cleanup is best effort: a failed delete keeps
/// the record so the next cycle retries it.
pub struct RetentionReaper {
    registry: JobRegistry,
    config: Arc<Config>,
}

impl RetentionReaper {
    pub fn new(registry: JobRegistry, config: Arc<Config>) -> Self {
        Self { registry, config }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.config.cleanup_interval);
        // First tick fires immediately; that sweep is a no-op on a fresh
        // registry and cleans up leftovers after a restart.
        loop {
            ticker.tick().await;
            self.sweep(now_unix()).await;
        }
    }

    /// One pass over the registry at the given clock reading.
    pub async fn sweep(&self, now: i64) {
        for (job_id, job) in self.registry.snapshot() {
            if !self.expired(&job, now) {
                continue;
            }
            if self.purge(&job_id, &job).await {
                self.registry.delete(&job_id);
                tracing::info!(job_id = %job_id, status = ?job.status, "job purged");
            }
        }
    }

    fn expired(&self, job: &Job, now: i64) -> bool {
        match job.status {
            JobStatus::Done => job
                .created_at
                .is_some_and(|t| now - t > self.config.file_ttl.as_secs() as i64),
            JobStatus::Error => job
                .terminal_at
                .is_some_and(|t| now - t > self.config.error_ttl.as_secs() as i64),
            JobStatus::Downloading => false,
        }
    }

    /// Delete the artifact and the working directory. Returns false when
    /// something could not be removed and the record must stay for a
    /// retry on the next cycle.
    async fn purge(&self, job_id: &str, job: &Job) -> bool {
        if let Some(artifact) = &job.artifact_path {
            if let Err(err) = tokio::fs::remove_file(artifact).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        job_id = %job_id,
                        path = %artifact.display(),
                        error = %err,
                        "failed to delete artifact, will retry"
                    );
                    return false;
                }
            }
        }

        let job_dir = self.config.jobs_dir().join(job_id);
        if let Err(err) = tokio::fs::remove_dir_all(&job_dir).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    job_id = %job_id,
                    path = %job_dir.display(),
                    error = %err,
                    "failed to delete working directory, will retry"
                );
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn setup(tmp: &tempfile::TempDir) -> (JobRegistry, RetentionReaper, Arc<Config>) {
        let mut config = Config::default();
        config.data_dir = tmp.path().to_path_buf();
        let config = Arc::new(config);
        std::fs::create_dir_all(config.jobs_dir()).unwrap();
        std::fs::create_dir_all(config.merged_dir()).unwrap();

        let registry = JobRegistry::new();
        let reaper = RetentionReaper::new(registry.clone(), config.clone());
        (registry, reaper, config)
    }

    fn done_job(artifact: PathBuf, completed_at: i64) -> Job {
        Job {
            status: JobStatus::Done,
            filename: Some("clip.mp4".to_string()),
            size: Some(12),
            created_at: Some(completed_at),
            error: None,
            artifact_path: Some(artifact),
            terminal_at: Some(completed_at),
        }
    }

    fn materialize_job(config: &Config, job_id: &str) -> PathBuf {
        let job_dir = config.jobs_dir().join(job_id);
        std::fs::create_dir_all(&job_dir).unwrap();
        std::fs::write(job_dir.join("video.mp4"), b"scratch").unwrap();

        let artifact = config.merged_dir().join(format!("{job_id}.mp4"));
        std::fs::write(&artifact, b"artifact").unwrap();
        artifact
    }

    #[tokio::test]
    async fn purges_done_job_past_ttl_with_its_files() {
        let tmp = tempfile::tempdir().unwrap();
        let (registry, reaper, config) = setup(&tmp);

        let now = now_unix();
        let artifact = materialize_job(&config, "old");
        registry.insert_raw("old", done_job(artifact.clone(), now - 181));

        reaper.sweep(now).await;

        assert!(registry.get("old").is_none());
        assert!(!artifact.exists());
        assert!(!config.jobs_dir().join("old").exists());
    }

    #[tokio::test]
    async fn keeps_done_job_inside_ttl() {
        let tmp = tempfile::tempdir().unwrap();
        let (registry, reaper, config) = setup(&tmp);

        let now = now_unix();
        let artifact = materialize_job(&config, "fresh");
        registry.insert_raw("fresh", done_job(artifact.clone(), now - 10));

        reaper.sweep(now).await;

        assert!(registry.get("fresh").is_some());
        assert!(artifact.exists());
    }

    #[tokio::test]
    async fn error_jobs_age_on_their_own_ttl() {
        let tmp = tempfile::tempdir().unwrap();
        let (registry, reaper, _config) = setup(&tmp);

        let now = now_unix();
        let mut stale = Job::downloading();
        stale.status = JobStatus::Error;
        stale.error = Some("boom".to_string());
        stale.terminal_at = Some(now - 601);
        registry.insert_raw("stale-error", stale);

        let mut recent = Job::downloading();
        recent.status = JobStatus::Error;
        recent.error = Some("boom".to_string());
        recent.terminal_at = Some(now - 30);
        registry.insert_raw("recent-error", recent);

        reaper.sweep(now).await;

        assert!(registry.get("stale-error").is_none());
        assert!(registry.get("recent-error").is_some());
    }

    #[tokio::test]
    async fn in_progress_jobs_are_never_purged() {
        let tmp = tempfile::tempdir().unwrap();
        let (registry, reaper, _config) = setup(&tmp);

        registry.create("busy");
        reaper.sweep(now_unix() + 1_000_000).await;
        assert!(registry.get("busy").is_some());
    }

    #[tokio::test]
    async fn missing_files_do_not_block_the_purge() {
        let tmp = tempfile::tempdir().unwrap();
        let (registry, reaper, config) = setup(&tmp);

        let now = now_unix();
        // Artifact already gone, working dir never created.
        let ghost = config.merged_dir().join("ghost.mp4");
        registry.insert_raw("ghost", done_job(ghost, now - 400));

        reaper.sweep(now).await;
        assert!(registry.get("ghost").is_none());
    }
}

// Job registry - the single shared mutable structure in the system

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use super::models::{Job, JobStatus};
use super::utils::now_unix;

/// Concurrently-accessed table of job state.
///
/// All components observe jobs exclusively through this interface; reads
/// clone the record under the lock, so a reader never sees a partially
/// written job. Terminal writes are accepted only while the job is still
/// downloading, which makes status transitions one-way by construction.
#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh in-progress record for a just-submitted job.
    pub fn create(&self, job_id: &str) {
        self.inner
            .write()
            .insert(job_id.to_string(), Job::downloading());
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.inner.read().get(job_id).cloned()
    }

    /// Terminal success write. Ignored if the job is already terminal.
    pub fn set_done(&self, job_id: &str, filename: String, artifact_path: PathBuf, size: u64) {
        let mut table = self.inner.write();
        if let Some(job) = table.get_mut(job_id) {
            if job.status != JobStatus::Downloading {
                return;
            }
            let now = now_unix();
            job.status = JobStatus::Done;
            job.filename = Some(filename);
            job.size = Some(size);
            job.created_at = Some(now);
            job.artifact_path = Some(artifact_path);
            job.terminal_at = Some(now);
        }
    }

    /// Terminal failure write. Ignored if the job is already terminal.
    pub fn set_error(&self, job_id: &str, message: String) {
        let mut table = self.inner.write();
        if let Some(job) = table.get_mut(job_id) {
            if job.status != JobStatus::Downloading {
                return;
            }
            job.status = JobStatus::Error;
            job.error = Some(message);
            job.terminal_at = Some(now_unix());
        }
    }

    pub fn delete(&self, job_id: &str) {
        self.inner.write().remove(job_id);
    }

    /// Point-in-time copy of the whole table, for the reaper's scan.
    pub fn snapshot(&self) -> Vec<(String, Job)> {
        self.inner
            .read()
            .iter()
            .map(|(id, job)| (id.clone(), job.clone()))
            .collect()
    }

    /// Find the done job owning a display filename, if any. O(live jobs)
    /// by design at this scale.
    pub fn find_done_by_filename(&self, filename: &str) -> Option<Job> {
        self.inner
            .read()
            .values()
            .find(|job| {
                job.status == JobStatus::Done && job.filename.as_deref() == Some(filename)
            })
            .cloned()
    }

    #[cfg(test)]
    pub(crate) fn insert_raw(&self, job_id: &str, job: Job) {
        self.inner.write().insert(job_id.to_string(), job);
    }
}

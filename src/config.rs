// Runtime configuration - defaults with environment overrides

use std::path::PathBuf;
use std::time::Duration;

use crate::downloader::platform::Platform;

/// Server and pipeline configuration.
///
/// Every field can be overridden through an environment variable so the
/// binary runs unchanged in containers and on bare metal.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Root under which per-job scratch dirs and the shared output dir live.
    pub data_dir: PathBuf,
    /// How long a finished artifact stays downloadable.
    pub file_ttl: Duration,
    /// How long a failed job record is kept for status polling.
    pub error_ttl: Duration,
    /// Reaper wake-up period.
    pub cleanup_interval: Duration,
    /// Ceiling on concurrently running acquisition workers.
    pub max_concurrent_jobs: usize,
    /// Hard deadline for one acquisition (fetches + merge).
    pub acquire_deadline: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            data_dir: PathBuf::from("data"),
            file_ttl: Duration::from_secs(180),
            error_ttl: Duration::from_secs(600),
            cleanup_interval: Duration::from_secs(60),
            max_concurrent_jobs: 4,
            acquire_deadline: Duration::from_secs(30 * 60),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_parsed("PORT").unwrap_or(defaults.port),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            file_ttl: env_secs("FILE_TTL_SECS").unwrap_or(defaults.file_ttl),
            error_ttl: env_secs("ERROR_TTL_SECS").unwrap_or(defaults.error_ttl),
            cleanup_interval: env_secs("CLEANUP_INTERVAL_SECS")
                .unwrap_or(defaults.cleanup_interval),
            max_concurrent_jobs: env_parsed("MAX_CONCURRENT_JOBS")
                .unwrap_or(defaults.max_concurrent_jobs),
            acquire_deadline: env_secs("ACQUIRE_DEADLINE_SECS")
                .unwrap_or(defaults.acquire_deadline),
        }
    }

    /// Per-job scratch space: one subdirectory per job id.
    pub fn jobs_dir(&self) -> PathBuf {
        self.data_dir.join("jobs")
    }

    /// Flat shared directory holding finished artifacts.
    pub fn merged_dir(&self) -> PathBuf {
        self.data_dir.join("merged")
    }

    pub fn cookie_dir(&self) -> PathBuf {
        self.data_dir.join("cookies")
    }

    /// Cookie file for the given platform, if one has been provisioned.
    ///
    /// Looks for `<cookie_dir>/<platform>.txt` first, then the shared
    /// `cookies.txt` that predates per-platform credentials.
    pub fn cookie_file_for(&self, platform: Platform) -> Option<PathBuf> {
        let dir = self.cookie_dir();
        let mut candidates = Vec::new();
        if let Some(stem) = platform.cookie_stem() {
            candidates.push(dir.join(format!("{stem}.txt")));
        }
        candidates.push(dir.join("cookies.txt"));
        candidates.into_iter().find(|p| p.exists())
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parsed::<u64>(key).map(Duration::from_secs)
}

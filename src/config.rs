//! Engine configuration.
//!
//! All tuning knobs live here: the target list, the execution mode, the
//! check interval, concurrency and timeout bounds, and the retry policy
//! shared by fetches and deliveries.
//!
//! # Scheduling Strategy
//!
//! - **Check interval**: 10 minutes by default (configurable via `TAGWATCH_CHECK_INTERVAL_MINS`)
//! - **Jitter**: 0-20% added per repository to prevent thundering herd on restart
//! - **Concurrency**: at most 5 repositories checked at once by default

use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryConfig;
use crate::types::{RepoId, RepositoryTarget};

/// Default check interval (10 minutes).
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 600;

/// Default cap on concurrently checked repositories.
const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 5;

/// Default TTL for cached release responses (60 seconds).
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Default timeout for one release fetch attempt (30 seconds).
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default timeout for one channel send attempt (10 seconds).
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;

/// Default cap on how long a check waits for rate budget (2 minutes).
const DEFAULT_RATE_LIMIT_MAX_WAIT_SECS: u64 = 120;

/// Default jitter percentage (0-100).
const DEFAULT_JITTER_PERCENT: u8 = 20;

/// Default state file location.
const DEFAULT_STATE_PATH: &str = "tagwatch-state.json";

/// How the engine's check loop is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run cycles forever on a fixed interval.
    Continuous,

    /// Run exactly one cycle, then exit.
    Oneshot,

    /// Run one cycle per externally delivered tick.
    Scheduled,
}

impl RunMode {
    /// Parses a mode name as used in `TAGWATCH_MODE`.
    pub fn parse(s: &str) -> Option<RunMode> {
        match s {
            "continuous" => Some(RunMode::Continuous),
            "oneshot" => Some(RunMode::Oneshot),
            "scheduled" => Some(RunMode::Scheduled),
            _ => None,
        }
    }
}

/// Configuration for the release-watch engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Repositories to monitor.
    pub targets: Vec<RepositoryTarget>,

    /// How the check loop is driven.
    ///
    /// Default: continuous. Configure via `TAGWATCH_MODE`.
    pub mode: RunMode,

    /// Interval between check cycles in continuous mode.
    ///
    /// Default: 10 minutes. Configure via `TAGWATCH_CHECK_INTERVAL_MINS`.
    pub check_interval: Duration,

    /// Maximum number of repositories checked concurrently.
    ///
    /// Default: 5.
    pub max_concurrent_checks: usize,

    /// TTL for cached release responses. Zero disables the cache.
    ///
    /// Default: 60 seconds.
    pub cache_ttl: Duration,

    /// Timeout for one release fetch attempt.
    ///
    /// Default: 30 seconds.
    pub fetch_timeout: Duration,

    /// Timeout for one channel send attempt.
    ///
    /// Default: 10 seconds.
    pub send_timeout: Duration,

    /// Retry policy shared by release fetches and channel deliveries.
    pub retry: RetryConfig,

    /// Where dedup state is persisted.
    ///
    /// Default: `tagwatch-state.json`. Configure via `TAGWATCH_STATE_PATH`.
    pub state_path: PathBuf,

    /// Cap on how long a check queues for rate budget before failing.
    ///
    /// Default: 2 minutes.
    pub rate_limit_max_wait: Duration,

    /// Jitter percentage added to the check interval (0-100).
    ///
    /// Prevents thundering herd when several instances restart together.
    /// Default: 20 (meaning 0-20% jitter).
    pub jitter_percent: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates a `Config` with default values and no targets.
    pub fn new() -> Self {
        Config {
            targets: Vec::new(),
            mode: RunMode::Continuous,
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            max_concurrent_checks: DEFAULT_MAX_CONCURRENT_CHECKS,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            send_timeout: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
            retry: RetryConfig::DEFAULT,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            rate_limit_max_wait: Duration::from_secs(DEFAULT_RATE_LIMIT_MAX_WAIT_SECS),
            jitter_percent: DEFAULT_JITTER_PERCENT,
        }
    }

    /// Creates a `Config` from environment variables.
    ///
    /// Reads `TAGWATCH_MODE`, `TAGWATCH_CHECK_INTERVAL_MINS`,
    /// `TAGWATCH_MAX_CONCURRENT`, `TAGWATCH_STATE_PATH`, and
    /// `TAGWATCH_REPOS` (comma-separated `owner/repo` entries; entries that
    /// fail to parse are dropped). Other values use defaults.
    pub fn from_env() -> Self {
        let mut config = Config::new();

        if let Ok(mode) = std::env::var("TAGWATCH_MODE") {
            if let Some(mode) = RunMode::parse(&mode) {
                config.mode = mode;
            }
        }

        if let Some(mins) = std::env::var("TAGWATCH_CHECK_INTERVAL_MINS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.check_interval = Duration::from_secs(mins * 60);
        }

        if let Some(max) = std::env::var("TAGWATCH_MAX_CONCURRENT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            config.max_concurrent_checks = max.max(1);
        }

        if let Ok(path) = std::env::var("TAGWATCH_STATE_PATH") {
            config.state_path = PathBuf::from(path);
        }

        if let Ok(repos) = std::env::var("TAGWATCH_REPOS") {
            config.targets = repos
                .split(',')
                .filter_map(|entry| RepoId::parse(entry.trim()).ok())
                .map(RepositoryTarget::new)
                .collect();
        }

        config
    }

    pub fn with_targets(mut self, targets: Vec<RepositoryTarget>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    /// Returns the check interval with jitter added for a specific
    /// repository.
    ///
    /// The jitter is deterministic based on the repo ID hash, so the same
    /// repo always gets the same jitter.
    ///
    /// # Formula
    ///
    /// `interval * (1 + (hash(repo) % jitter_percent) / 100)`
    pub fn check_interval_with_jitter(&self, repo: &RepoId) -> Duration {
        Duration::from_secs_f64(self.check_interval.as_secs_f64() * self.jitter_factor(repo))
    }

    /// Computes the jitter factor for a repository.
    ///
    /// Returns a value between 1.0 and 1.0 + (jitter_percent / 100).
    fn jitter_factor(&self, repo: &RepoId) -> f64 {
        if self.jitter_percent == 0 {
            return 1.0;
        }
        let hash = repo_hash(repo);
        let jitter = (hash % self.jitter_percent as u64) as f64 / 100.0;
        1.0 + jitter
    }
}

/// Computes a hash of the repository ID.
fn repo_hash(repo: &RepoId) -> u64 {
    let mut hasher = std::hash::DefaultHasher::new();
    repo.hash(&mut hasher);
    hasher.finish()
}

//! The state store: load, record, flush.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::types::RepoId;

use super::fsync::{fsync_dir, fsync_file};
use super::record::RepositoryState;

/// Errors that can occur while persisting state.
///
/// Load failures never surface here - a missing or corrupt state file
/// degrades to empty state with a warning, because losing dedup state is
/// recoverable while crashing mid-run is not.
#[derive(Debug, Error)]
pub enum StateError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, RepositoryState>,
    dirty: bool,
}

/// Durable mapping of repository to per-repository state.
///
/// All mutations go through one internal lock, which enforces the
/// single-writer-per-repository invariant without any caller discipline.
/// `record_notification` persists synchronously relative to its caller;
/// `record_check` batches persistence until [`StateStore::flush`].
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl StateStore {
    /// Opens a store backed by the given file, loading existing state.
    ///
    /// A missing file is a normal first run. An unreadable or unparseable
    /// file degrades to empty state with a warning; entries that are
    /// individually damaged are skipped without discarding the rest.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        StateStore {
            path,
            inner: Mutex::new(Inner {
                entries,
                dirty: false,
            }),
        }
    }

    /// Returns a copy of the state for one repository.
    pub async fn get(&self, repo: &RepoId) -> Option<RepositoryState> {
        let inner = self.inner.lock().await;
        inner.entries.get(&repo.to_string()).cloned()
    }

    /// Returns the last-notified version for one repository.
    pub async fn last_notified_version(&self, repo: &RepoId) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(&repo.to_string())
            .and_then(|state| state.last_notified_version.clone())
    }

    /// Returns a copy of every persisted entry.
    pub async fn snapshot(&self) -> BTreeMap<String, RepositoryState> {
        let inner = self.inner.lock().await;
        inner.entries.clone()
    }

    /// Records a completed check for a repository, in memory only.
    ///
    /// Persistence is batched; call [`StateStore::flush`] at the end of the
    /// cycle.
    pub async fn record_check(&self, repo: &RepoId, at: DateTime<Utc>) {
        let mut inner = self.inner.lock().await;
        inner
            .entries
            .entry(repo.to_string())
            .or_insert_with(|| RepositoryState::new(at))
            .record_check(at);
        inner.dirty = true;
    }

    /// Records a dispatched notification and persists the full state
    /// atomically before returning.
    ///
    /// This gates at-least-once notification correctness, so unlike
    /// `record_check` it never batches.
    pub async fn record_notification(
        &self,
        repo: &RepoId,
        version: &str,
        channels: Vec<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .entries
            .entry(repo.to_string())
            .or_insert_with(|| RepositoryState::new(at))
            .record_notification(version, channels, at);

        persist(&self.path, &inner.entries)?;
        inner.dirty = false;
        Ok(())
    }

    /// Persists any batched mutations.
    pub async fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.dirty {
            return Ok(());
        }
        persist(&self.path, &inner.entries)?;
        inner.dirty = false;
        Ok(())
    }
}

/// Loads entries tolerantly; never fails the run.
fn load_entries(path: &Path) -> BTreeMap<String, RepositoryState> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no state file, starting fresh");
            return BTreeMap::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read state file, starting with empty state");
            return BTreeMap::new();
        }
    };

    let raw: serde_json::Map<String, serde_json::Value> = match serde_json::from_slice(&bytes) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file is corrupt, starting with empty state");
            return BTreeMap::new();
        }
    };

    let mut entries = BTreeMap::new();
    for (repo, value) in raw {
        match serde_json::from_value::<RepositoryState>(value) {
            Ok(state) => {
                entries.insert(repo, state);
            }
            Err(e) => {
                // Partial-write recovery: damage is scoped to this entry.
                warn!(%repo, error = %e, "skipping damaged state entry");
            }
        }
    }
    entries
}

/// Writes the full state atomically: temp file, fsync, rename, dir fsync.
///
/// Readers always see either the old or the new state, never a partial
/// write.
fn persist(path: &Path, entries: &BTreeMap<String, RepositoryState>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let bytes = serde_json::to_vec_pretty(entries)?;
    let tmp_path = path.with_extension("json.tmp");

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        fsync_file(&file)?;
    }

    std::fs::rename(&tmp_path, path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fsync_dir(parent)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn repo() -> RepoId {
        RepoId::new("octo", "example")
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json"));
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "this is not json").unwrap();

        let store = StateStore::open(&path);
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn damaged_entry_is_skipped_individually() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{
                "octo/example": {
                    "last_notified_version": "1.2.0",
                    "last_check_at": "2024-01-01T00:00:00Z",
                    "check_count": 3,
                    "notification_history": []
                },
                "octo/broken": {"last_check_at": "not a timestamp"}
            }"#,
        )
        .unwrap();

        let store = StateStore::open(&path);
        let snapshot = store.snapshot().await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot["octo/example"].last_notified_version.as_deref(),
            Some("1.2.0")
        );
    }

    #[tokio::test]
    async fn notification_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open(&path);
        store.record_check(&repo(), Utc::now()).await;
        store
            .record_notification(&repo(), "1.3.0", vec!["file".to_string()], Utc::now())
            .await
            .unwrap();

        // Reopen and verify the persisted contents.
        let reopened = StateStore::open(&path);
        let state = reopened.get(&repo()).await.unwrap();
        assert_eq!(state.last_notified_version.as_deref(), Some("1.3.0"));
        assert_eq!(state.check_count, 1);
        assert_eq!(state.notification_history.len(), 1);
        assert_eq!(state.notification_history[0].channels, vec!["file"]);
    }

    #[tokio::test]
    async fn record_notification_persists_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open(&path);
        store
            .record_notification(&repo(), "2.0.0", Vec::new(), Utc::now())
            .await
            .unwrap();

        // No flush: the file must already reflect the notification.
        assert!(path.exists());
        let reopened = StateStore::open(&path);
        assert_eq!(
            reopened.last_notified_version(&repo()).await.as_deref(),
            Some("2.0.0")
        );
    }

    #[tokio::test]
    async fn record_check_batches_until_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open(&path);
        store.record_check(&repo(), Utc::now()).await;
        assert!(!path.exists());

        store.flush().await.unwrap();
        assert!(path.exists());

        let reopened = StateStore::open(&path);
        assert_eq!(reopened.get(&repo()).await.unwrap().check_count, 1);
    }

    #[tokio::test]
    async fn flush_without_changes_is_a_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open(&path);
        store.flush().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open(&path);
        store
            .record_notification(&repo(), "1.0.0", Vec::new(), Utc::now())
            .await
            .unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn state_survives_many_repositories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open(&path);
        for i in 0..10 {
            let repo = RepoId::new("octo", format!("repo-{i}"));
            store
                .record_notification(&repo, &format!("0.{i}.0"), Vec::new(), Utc::now())
                .await
                .unwrap();
        }

        let reopened = StateStore::open(&path);
        assert_eq!(reopened.snapshot().await.len(), 10);
    }
}

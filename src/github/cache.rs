//! Short-TTL cache for release responses.
//!
//! A check cycle that queries the same repository twice (e.g. a manual
//! trigger racing a scheduled one) should not spend two budget tokens.
//! "Repository has no releases" is cached too, since it costs a request to
//! discover.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::types::{ReleaseInfo, RepoId};

#[derive(Debug, Clone)]
struct CacheEntry {
    fetched_at: Instant,
    release: Option<ReleaseInfo>,
}

/// A TTL cache of fetch results keyed by repository.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<RepoId, CacheEntry>>,
}

impl ResponseCache {
    /// Creates a cache with the given TTL. A zero TTL disables caching.
    pub fn new(ttl: Duration) -> Self {
        ResponseCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached fetch result for a repository, if still fresh.
    ///
    /// The outer `Option` is cache presence; the inner one is the cached
    /// "has no releases" outcome.
    pub fn get(&self, repo: &RepoId) -> Option<Option<ReleaseInfo>> {
        if self.ttl.is_zero() {
            return None;
        }

        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(repo)?;
        if entry.fetched_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.release.clone())
    }

    /// Stores a fetch result.
    pub fn insert(&self, repo: RepoId, release: Option<ReleaseInfo>) {
        if self.ttl.is_zero() {
            return;
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            repo,
            CacheEntry {
                fetched_at: Instant::now(),
                release,
            },
        );
    }

    /// Drops entries older than the TTL.
    pub fn purge_expired(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| entry.fetched_at.elapsed() <= self.ttl);
    }
}

//! Persisted per-repository records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of notification history entries kept per repository.
/// Oldest entries are evicted first.
pub const HISTORY_CAP: usize = 50;

/// One past notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// The version that was notified.
    pub version: String,

    /// When the notification was dispatched.
    pub notified_at: DateTime<Utc>,

    /// Names of the channels that delivered successfully.
    pub channels: Vec<String>,
}

/// Persisted state for one monitored repository.
///
/// Created on the first successful check; mutated at most once per check
/// cycle, only after the notification decision is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryState {
    /// The last version a notification was recorded for, if any.
    pub last_notified_version: Option<String>,

    /// When the repository was last checked (ISO 8601 UTC).
    pub last_check_at: DateTime<Utc>,

    /// Number of checks performed across all runs.
    pub check_count: u64,

    /// Bounded, ordered notification history (oldest first).
    #[serde(default)]
    pub notification_history: Vec<NotificationRecord>,
}

impl RepositoryState {
    /// Creates a fresh record for a repository's first check.
    pub fn new(checked_at: DateTime<Utc>) -> Self {
        RepositoryState {
            last_notified_version: None,
            last_check_at: checked_at,
            check_count: 0,
            notification_history: Vec::new(),
        }
    }

    /// Records a completed check.
    pub fn record_check(&mut self, at: DateTime<Utc>) {
        self.last_check_at = at;
        self.check_count += 1;
    }

    /// Records a dispatched notification, advancing the last-notified
    /// version and appending to history with cap eviction.
    pub fn record_notification(
        &mut self,
        version: impl Into<String>,
        channels: Vec<String>,
        at: DateTime<Utc>,
    ) {
        let version = version.into();
        self.notification_history.push(NotificationRecord {
            version: version.clone(),
            notified_at: at,
            channels,
        });
        if self.notification_history.len() > HISTORY_CAP {
            let excess = self.notification_history.len() - HISTORY_CAP;
            self.notification_history.drain(..excess);
        }
        self.last_notified_version = Some(version);
    }
}

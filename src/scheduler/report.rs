//! Cycle and per-repository check reports.

use chrono::{DateTime, Utc};

use crate::compare::SkipReason;
use crate::notify::DispatchOutcome;
use crate::types::RepoId;

/// What happened when one repository was checked.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// The target is disabled; nothing was fetched.
    Disabled,

    /// The repository has no published releases (or does not exist).
    NoReleases,

    /// A release was seen but did not warrant a notification.
    Skipped {
        version: String,
        reason: SkipReason,
    },

    /// A new release was detected and dispatched.
    Notified {
        version: String,
        outcomes: Vec<DispatchOutcome>,
    },

    /// The check failed. `fatal` marks failures that end the whole run.
    Failed {
        message: String,
        fatal: bool,
    },

    /// The check never ran because the cycle was terminated first.
    Aborted,
}

impl CheckOutcome {
    pub fn is_notified(&self) -> bool {
        matches!(self, CheckOutcome::Notified { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, CheckOutcome::Failed { fatal: true, .. })
    }
}

/// The report for one repository in one cycle.
#[derive(Debug, Clone)]
pub struct RepoCheckReport {
    pub repo: RepoId,
    pub outcome: CheckOutcome,
}

/// The report for one complete check cycle.
///
/// Always produced, even when the cycle terminated early; aborted
/// repositories appear with [`CheckOutcome::Aborted`].
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// When the cycle started.
    pub started_at: DateTime<Utc>,

    /// One report per configured target.
    pub reports: Vec<RepoCheckReport>,

    /// Set when the cycle terminated the run (authentication failure).
    pub fatal: Option<String>,
}

impl CycleReport {
    /// Number of repositories that produced a notification.
    pub fn notified_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.is_notified())
            .count()
    }

    /// Number of repositories whose check failed.
    pub fn failed_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, CheckOutcome::Failed { .. }))
            .count()
    }

    /// Looks up the report for one repository.
    pub fn report_for(&self, repo: &RepoId) -> Option<&RepoCheckReport> {
        self.reports.iter().find(|r| &r.repo == repo)
    }
}

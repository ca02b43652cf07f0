//! The notification decision function.

use std::fmt;

use crate::types::{ReleaseFilter, ReleaseInfo};

use super::stability::is_prerelease;
use super::version::is_strictly_newer;

/// Why a candidate release was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The candidate is not strictly newer than the last-notified version.
    NotNewer,

    /// The filter is stable-only and the candidate is a prerelease.
    PrereleaseFiltered,

    /// The filter is prerelease-only and the candidate is stable.
    StableFiltered,

    /// The tag did not match the configured pattern.
    PatternMismatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NotNewer => "not_newer",
            SkipReason::PrereleaseFiltered => "prerelease_filtered",
            SkipReason::StableFiltered => "stable_filtered",
            SkipReason::PatternMismatch => "pattern_mismatch",
        };
        f.write_str(s)
    }
}

/// The outcome of evaluating a candidate release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Notify for this version.
    Notify(String),

    /// Do not notify, for the given reason.
    Skip(SkipReason),
}

impl Decision {
    pub fn is_notify(&self) -> bool {
        matches!(self, Decision::Notify(_))
    }
}

/// Decides whether a candidate release warrants a notification.
///
/// Pure function: same inputs always yield the same decision. Filter
/// rejection is reported before staleness, so a filtered release is never
/// misreported as merely old. On a first run (`last_notified` is `None`)
/// any candidate that passes the filter is notified.
pub fn should_notify(
    last_notified: Option<&str>,
    candidate: &ReleaseInfo,
    filter: &ReleaseFilter,
) -> Decision {
    match filter {
        ReleaseFilter::All => {}
        ReleaseFilter::StableOnly => {
            if is_prerelease(candidate) {
                return Decision::Skip(SkipReason::PrereleaseFiltered);
            }
        }
        ReleaseFilter::PrereleaseOnly => {
            if !is_prerelease(candidate) {
                return Decision::Skip(SkipReason::StableFiltered);
            }
        }
        ReleaseFilter::Pattern(pattern) => {
            if !pattern.is_match(&candidate.tag) {
                return Decision::Skip(SkipReason::PatternMismatch);
            }
        }
    }

    if let Some(last) = last_notified {
        if !is_strictly_newer(&candidate.tag, last) {
            return Decision::Skip(SkipReason::NotNewer);
        }
    }

    Decision::Notify(candidate.tag.clone())
}

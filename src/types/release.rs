//! Release data and the notification event contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RepositoryTarget;

/// A release as returned by the provider.
///
/// Created fresh on every fetch; never persisted verbatim (only the tag is
/// recorded in the state store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// The git tag the release was published under.
    pub tag: String,

    /// The release title (may be empty; falls back to the tag in payloads).
    pub name: String,

    /// When the release was published.
    pub published_at: DateTime<Utc>,

    /// Whether the provider marked the release as a prerelease.
    pub is_prerelease: bool,

    /// Web URL of the release page.
    pub html_url: String,

    /// Free-text release notes.
    pub body: String,
}

/// The payload passed to the dispatcher for one detected new release.
///
/// Immutable; constructed once and fanned out unchanged to every enabled
/// channel.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    /// The monitored repository the release belongs to.
    pub repository: RepositoryTarget,

    /// The release that triggered the notification.
    pub release: ReleaseInfo,

    /// When the engine detected the release as new.
    pub detected_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(repository: RepositoryTarget, release: ReleaseInfo) -> Self {
        NotificationEvent {
            repository,
            release,
            detected_at: Utc::now(),
        }
    }

    /// Produces the stable wire contract handed to channel implementations.
    ///
    /// Field names here are part of the external interface; concrete
    /// channels may serialize this directly.
    pub fn payload(&self) -> NotificationPayload {
        NotificationPayload {
            repository_url: self.repository.repo.to_string(),
            repository_name: self.repository.display_name.clone(),
            version: self.release.tag.clone(),
            release_name: if self.release.name.is_empty() {
                self.release.tag.clone()
            } else {
                self.release.name.clone()
            },
            html_url: self.release.html_url.clone(),
            published_at: self.release.published_at,
            body: self.release.body.clone(),
        }
    }
}

/// The serialized notification contract with stable field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub repository_url: String,
    pub repository_name: String,
    pub version: String,
    pub release_name: String,
    pub html_url: String,
    pub published_at: DateTime<Utc>,
    pub body: String,
}

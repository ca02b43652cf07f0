//! Domain types for the release watcher.
//!
//! This module collects the core data model: repository identifiers, the
//! monitored-target records produced by the config layer, and the release
//! and notification-event types that flow through the engine.

mod ids;
mod release;
mod target;

pub use ids::RepoId;
pub use release::{NotificationEvent, NotificationPayload, ReleaseInfo};
pub use target::{ReleaseFilter, RepositoryTarget};

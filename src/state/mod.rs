//! Durable, crash-tolerant per-repository state.
//!
//! The state file is a JSON object keyed by `owner/repo`, rewritten
//! atomically (write-to-temp-then-rename with fsync) on every recorded
//! notification. Missing or corrupt files degrade to empty state with a
//! warning rather than failing the run; individually damaged entries are
//! skipped without discarding the rest of the file.

mod fsync;
mod record;
mod store;

pub use record::{HISTORY_CAP, NotificationRecord, RepositoryState};
pub use store::{StateError, StateStore};

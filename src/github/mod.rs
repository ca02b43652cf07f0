//! Rate-limited GitHub release client.
//!
//! This module fetches the latest release for monitored repositories via
//! octocrab, under a shared token budget sized from the provider's
//! advertised remaining quota. Successful responses are cached with a short
//! TTL so duplicate queries within one check cycle do not double-spend the
//! budget.
//!
//! Key features:
//! - Error taxonomy separating fatal auth failures from transient ones
//! - Queue-not-fail rate limiting with a bounded wait
//! - Exponential backoff retry for transient failures
//! - A fetcher trait seam so the scheduler is testable with mocks

mod cache;
mod client;
mod error;
mod rate;

pub use cache::ResponseCache;
pub use client::{ReleaseClient, ReleaseFetcher};
pub use error::{FetchError, FetchErrorKind};
pub use rate::RateBudget;

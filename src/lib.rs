//! tagwatch - watches GitHub repositories for newly published releases and
//! dispatches notifications about them across independent channels.
//!
//! This library provides the core engine: the rate-limited release client,
//! the release comparator, the persisted state store, the notification
//! dispatcher, and the scheduler that drives check cycles.

pub mod compare;
pub mod config;
pub mod github;
pub mod notify;
pub mod retry;
pub mod scheduler;
pub mod state;
pub mod types;

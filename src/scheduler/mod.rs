//! Check-cycle scheduling and execution modes.
//!
//! Three modes share the same cycle implementation:
//!
//! - **Continuous**: cycles forever on a fixed interval with per-instance
//!   jitter.
//! - **Oneshot**: one cycle, then exit (cron-friendly).
//! - **Scheduled**: one cycle per externally delivered tick.
//!
//! Shutdown is cooperative via a [`CancellationToken`]: in-flight checks
//! finish and state is flushed before the scheduler returns.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod report;
mod runner;

pub use report::{CheckOutcome, CycleReport, RepoCheckReport};
pub use runner::{Scheduler, SchedulerError};

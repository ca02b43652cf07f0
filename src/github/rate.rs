//! Shared token budget for API requests.
//!
//! Every concurrent fetch spends one token from this budget. When the
//! budget is exhausted, acquirers queue rather than fail, up to a bounded
//! wait; only after that wait expires do they surface `RateLimited`. The
//! budget is resized from the provider's advertised remaining quota at the
//! start of each check cycle.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use super::error::FetchError;

/// Budget assumed before the first quota refresh. Matches the provider's
/// unauthenticated core limit, so a run that never manages to read its real
/// quota still stays polite.
const DEFAULT_INITIAL_BUDGET: u64 = 60;

/// A mutex-guarded token budget with queue-not-fail semantics.
#[derive(Debug)]
pub struct RateBudget {
    remaining: Mutex<u64>,
    refilled: Notify,
    max_wait: Duration,
}

impl RateBudget {
    /// Creates a budget with the default initial size and the given bound
    /// on how long an acquirer may queue.
    pub fn new(max_wait: Duration) -> Self {
        Self::with_initial(DEFAULT_INITIAL_BUDGET, max_wait)
    }

    /// Creates a budget with an explicit initial token count.
    pub fn with_initial(initial: u64, max_wait: Duration) -> Self {
        RateBudget {
            remaining: Mutex::new(initial),
            refilled: Notify::new(),
            max_wait,
        }
    }

    /// Acquires one token, queueing up to the bounded wait when the budget
    /// is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` when no token becomes available within the
    /// bounded wait.
    pub async fn acquire(&self) -> Result<(), FetchError> {
        let deadline = Instant::now() + self.max_wait;

        loop {
            // Register for wakeups before checking, so a refill between the
            // check and the await is not missed.
            let refilled = self.refilled.notified();

            {
                let mut remaining = self.remaining.lock().unwrap_or_else(|e| e.into_inner());
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(());
                }
            }

            debug!("rate budget exhausted, queueing");
            if timeout_at(deadline, refilled).await.is_err() {
                return Err(FetchError::rate_limited(format!(
                    "rate budget exhausted and no quota arrived within {:?}",
                    self.max_wait
                )));
            }
        }
    }

    /// Resizes the budget to the provider's advertised remaining quota.
    ///
    /// Queued acquirers are woken when the new size is non-zero.
    pub fn set_remaining(&self, tokens: u64) {
        {
            let mut remaining = self.remaining.lock().unwrap_or_else(|e| e.into_inner());
            *remaining = tokens;
        }
        if tokens > 0 {
            self.refilled.notify_waiters();
        }
    }

    /// Current token count (diagnostics and tests).
    pub fn remaining(&self) -> u64 {
        *self.remaining.lock().unwrap_or_else(|e| e.into_inner())
    }
}

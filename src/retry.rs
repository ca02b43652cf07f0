//! Shared bounded-retry policy with exponential backoff.
//!
//! Both the release client and the notification dispatcher retry transient
//! failures through this module, so backoff behavior is consistent and
//! independently testable. Retries only apply to errors the caller's
//! predicate classifies as transient; everything else is returned
//! immediately.

use std::future::Future;
use std::time::Duration;

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the initial one.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Cap for exponential growth.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (typically 2.0).
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Default policy: 3 attempts with 2s, 4s delays between them.
    pub const DEFAULT: Self = Self {
        max_attempts: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(30),
        backoff_multiplier: 2.0,
    };

    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Computes the delay before retry number `attempt` (0-indexed).
    ///
    /// The delay grows exponentially, `initial_delay * multiplier^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }

    /// Returns an iterator over all backoff delays.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts.saturating_sub(1)).map(|attempt| self.delay_for_attempt(attempt))
    }

    /// Total maximum time spent waiting between attempts.
    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Outcome of running an operation under a retry policy.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// The operation succeeded.
    Success(T),

    /// A transient error persisted through every allowed attempt.
    ExhaustedRetries {
        /// The last error encountered.
        last_error: E,
        /// Number of attempts made.
        attempts: u32,
    },

    /// A non-retriable error occurred; no further attempts were made.
    Fatal(E),
}

impl<T, E> RetryResult<T, E> {
    /// Collapses to a plain `Result`, dropping the attempt count.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::ExhaustedRetries { last_error, .. } => Err(last_error),
            RetryResult::Fatal(e) => Err(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }
}

/// Executes an async operation with bounded retry.
///
/// `is_retriable` decides whether a given error is worth another attempt;
/// errors it rejects are returned immediately as `Fatal`.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    config: RetryConfig,
    mut operation: F,
    is_retriable: P,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) => {
                attempt += 1;

                if !is_retriable(&e) {
                    return RetryResult::Fatal(e);
                }
                if attempt >= max_attempts {
                    return RetryResult::ExhaustedRetries {
                        last_error: e,
                        attempts: attempt,
                    };
                }

                let delay = config.delay_for_attempt(attempt - 1);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Permanent,
    }

    fn retriable(e: &TestError) -> bool {
        *e == TestError::Transient
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(10),
            2.0,
        )
    }

    // ─── Unit tests ───

    #[test]
    fn default_config_values() {
        let config = RetryConfig::DEFAULT;
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_secs(2));
        assert_eq!(config.backoff_multiplier, 2.0);
    }

    #[test]
    fn default_delays_are_2_4() {
        let delays: Vec<_> = RetryConfig::DEFAULT.delays().collect();
        assert_eq!(delays, vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[test]
    fn total_max_wait_default() {
        assert_eq!(RetryConfig::DEFAULT.total_max_wait(), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(
            fast_config(3),
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, TestError>(42) }
            },
            retriable,
        )
        .await;

        assert!(result.is_success());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fatal_error_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(
            fast_config(3),
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(TestError::Permanent) }
            },
            retriable,
        )
        .await;

        assert!(matches!(result, RetryResult::Fatal(TestError::Permanent)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_succeeds_on_third_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(
            fast_config(3),
            move || {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok(42)
                    }
                }
            },
            retriable,
        )
        .await;

        assert!(result.is_success());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transient_exhausts_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(
            fast_config(3),
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(TestError::Transient) }
            },
            retriable,
        )
        .await;

        match result {
            RetryResult::ExhaustedRetries { attempts, .. } => assert_eq!(attempts, 3),
            _ => panic!("expected ExhaustedRetries"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_attempt_config_never_sleeps() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(
            fast_config(1),
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(TestError::Transient) }
            },
            retriable,
        )
        .await;

        assert!(matches!(
            result,
            RetryResult::ExhaustedRetries { attempts: 1, .. }
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    // ─── Property tests ───

    proptest! {
        #[test]
        fn delay_never_exceeds_cap(
            initial_ms in 1u64..1000,
            max_ms in 1000u64..60000,
            multiplier in 1.5f64..3.0,
            attempt in 0u32..10,
        ) {
            let config = RetryConfig::new(
                10,
                Duration::from_millis(initial_ms),
                Duration::from_millis(max_ms),
                multiplier,
            );

            prop_assert!(config.delay_for_attempt(attempt) <= Duration::from_millis(max_ms));
        }

        #[test]
        fn delay_sequence_is_monotonic(
            initial_ms in 1u64..1000,
            max_ms in 1000u64..60000,
            multiplier in 1.5f64..3.0,
            max_attempts in 2u32..15,
        ) {
            let config = RetryConfig::new(
                max_attempts,
                Duration::from_millis(initial_ms),
                Duration::from_millis(max_ms),
                multiplier,
            );

            let delays: Vec<_> = config.delays().collect();
            for window in delays.windows(2) {
                prop_assert!(window[1] >= window[0]);
            }
        }

        #[test]
        fn first_delay_equals_initial_delay(
            initial_ms in 1u64..10000,
            max_ms in 10000u64..100000,
            multiplier in 1.0f64..3.0,
        ) {
            let config = RetryConfig::new(
                5,
                Duration::from_millis(initial_ms),
                Duration::from_millis(max_ms),
                multiplier,
            );

            prop_assert_eq!(config.delay_for_attempt(0), Duration::from_millis(initial_ms));
        }

        #[test]
        fn total_wait_bounded_by_cap_times_retries(
            initial_ms in 1u64..1000,
            max_ms in 1000u64..10000,
            multiplier in 1.5f64..3.0,
            max_attempts in 1u32..20,
        ) {
            let config = RetryConfig::new(
                max_attempts,
                Duration::from_millis(initial_ms),
                Duration::from_millis(max_ms),
                multiplier,
            );

            let upper = Duration::from_millis(max_ms * max_attempts as u64);
            prop_assert!(config.total_max_wait() <= upper);
        }
    }
}

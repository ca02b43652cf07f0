//! The fan-out dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::retry::{RetryConfig, RetryResult, retry_with_backoff};
use crate::types::NotificationEvent;

use super::channel::{Channel, DeliveryError};

/// Per-channel result of a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The channel's stable name.
    pub channel_name: String,

    /// Whether delivery ultimately succeeded.
    pub success: bool,

    /// Number of attempts made (including the successful one, if any).
    pub attempts: u32,

    /// The last error encountered, when delivery failed.
    pub last_error: Option<String>,
}

/// Delivers notification events to every configured channel.
///
/// Channels are attempted independently and concurrently; there is no
/// fail-fast across channels and no required ordering among them. Each
/// channel gets its own bounded retry with backoff, and each send attempt
/// runs under its own timeout so one slow channel cannot stall the cycle.
pub struct Dispatcher {
    channels: Vec<Arc<dyn Channel>>,
    retry: RetryConfig,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(channels: Vec<Arc<dyn Channel>>, retry: RetryConfig, send_timeout: Duration) -> Self {
        Dispatcher {
            channels,
            retry,
            send_timeout,
        }
    }

    /// Returns true when no channels are configured.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Fans one event out to every channel, collecting one outcome per
    /// channel in configuration order.
    ///
    /// Exhausted retries are recorded in the outcome, never raised.
    pub async fn dispatch(&self, event: &NotificationEvent) -> Vec<DispatchOutcome> {
        let mut tasks = JoinSet::new();

        for (index, channel) in self.channels.iter().enumerate() {
            let channel = channel.clone();
            let event = event.clone();
            let retry = self.retry;
            let send_timeout = self.send_timeout;

            tasks.spawn(async move {
                let outcome = deliver_to_channel(channel.as_ref(), &event, retry, send_timeout).await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<DispatchOutcome>> = vec![None; self.channels.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(join_err) => {
                    // A panicking channel must not take the dispatch down.
                    warn!(error = %join_err, "channel task failed to complete");
                }
            }
        }

        outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.unwrap_or_else(|| DispatchOutcome {
                    channel_name: self.channels[index].name().to_string(),
                    success: false,
                    attempts: 0,
                    last_error: Some("channel task panicked".to_string()),
                })
            })
            .collect()
    }
}

/// Runs one channel's delivery under the shared retry policy.
async fn deliver_to_channel(
    channel: &dyn Channel,
    event: &NotificationEvent,
    retry: RetryConfig,
    send_timeout: Duration,
) -> DispatchOutcome {
    let name = channel.name().to_string();
    let attempts = AtomicU32::new(0);

    let result = retry_with_backoff(
        retry,
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                match tokio::time::timeout(send_timeout, channel.send(event)).await {
                    Ok(result) => result,
                    Err(_) => Err(DeliveryError::Timeout),
                }
            }
        },
        // Every delivery failure is worth the remaining attempts.
        |_: &DeliveryError| true,
    )
    .await;

    let attempts = attempts.load(Ordering::SeqCst);
    match result {
        RetryResult::Success(()) => {
            debug!(channel = %name, attempts, "notification delivered");
            DispatchOutcome {
                channel_name: name,
                success: true,
                attempts,
                last_error: None,
            }
        }
        RetryResult::ExhaustedRetries { last_error, .. } | RetryResult::Fatal(last_error) => {
            warn!(channel = %name, attempts, error = %last_error, "notification delivery failed");
            DispatchOutcome {
                channel_name: name,
                success: false,
                attempts,
                last_error: Some(last_error.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReleaseInfo, RepoId, RepositoryTarget};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::AtomicU32;

    fn sample_event() -> NotificationEvent {
        NotificationEvent::new(
            RepositoryTarget::new(RepoId::new("octo", "example")),
            ReleaseInfo {
                tag: "v1.0.0".to_string(),
                name: String::new(),
                published_at: Utc::now(),
                is_prerelease: false,
                html_url: String::new(),
                body: String::new(),
            },
        )
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(5),
            2.0,
        )
    }

    /// Records send calls; succeeds after a configurable number of failures.
    struct CountingChannel {
        name: String,
        calls: AtomicU32,
        failures_before_success: u32,
    }

    impl CountingChannel {
        fn reliable(name: &str) -> Arc<Self> {
            Arc::new(CountingChannel {
                name: name.to_string(),
                calls: AtomicU32::new(0),
                failures_before_success: 0,
            })
        }

        fn failing_forever(name: &str) -> Arc<Self> {
            Arc::new(CountingChannel {
                name: name.to_string(),
                calls: AtomicU32::new(0),
                failures_before_success: u32::MAX,
            })
        }

        fn flaky(name: &str, failures: u32) -> Arc<Self> {
            Arc::new(CountingChannel {
                name: name.to_string(),
                calls: AtomicU32::new(0),
                failures_before_success: failures,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Channel for CountingChannel {
        fn name(&self) -> &str {
            &self.name
        }

        async fn send(&self, _event: &NotificationEvent) -> Result<(), DeliveryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(DeliveryError::Rejected("simulated failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    /// Never completes within any reasonable timeout.
    struct StuckChannel;

    #[async_trait]
    impl Channel for StuckChannel {
        fn name(&self) -> &str {
            "stuck"
        }

        async fn send(&self, _event: &NotificationEvent) -> Result<(), DeliveryError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn all_channels_succeed() {
        let a = CountingChannel::reliable("a");
        let b = CountingChannel::reliable("b");
        let dispatcher = Dispatcher::new(
            vec![a.clone(), b.clone()],
            fast_retry(3),
            Duration::from_secs(1),
        );

        let outcomes = dispatcher.dispatch(&sample_event()).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.success));
        assert!(outcomes.iter().all(|o| o.attempts == 1));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn failing_channel_does_not_prevent_others() {
        let first = CountingChannel::reliable("first");
        let failing = CountingChannel::failing_forever("failing");
        let third = CountingChannel::reliable("third");
        let dispatcher = Dispatcher::new(
            vec![first.clone(), failing.clone(), third.clone()],
            fast_retry(3),
            Duration::from_secs(1),
        );

        let outcomes = dispatcher.dispatch(&sample_event()).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].channel_name, "first");
        assert!(outcomes[0].success);
        assert_eq!(outcomes[1].channel_name, "failing");
        assert!(!outcomes[1].success);
        assert_eq!(outcomes[1].attempts, 3);
        assert!(outcomes[1].last_error.as_deref().unwrap().contains("simulated failure"));
        assert_eq!(outcomes[2].channel_name, "third");
        assert!(outcomes[2].success);

        // Channels 1 and 3 were each invoked despite channel 2 failing.
        assert_eq!(first.calls(), 1);
        assert_eq!(failing.calls(), 3);
        assert_eq!(third.calls(), 1);
    }

    #[tokio::test]
    async fn flaky_channel_succeeds_within_retry_budget() {
        let flaky = CountingChannel::flaky("flaky", 2);
        let dispatcher = Dispatcher::new(vec![flaky.clone()], fast_retry(3), Duration::from_secs(1));

        let outcomes = dispatcher.dispatch(&sample_event()).await;

        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].attempts, 3);
        assert_eq!(flaky.calls(), 3);
    }

    #[tokio::test]
    async fn stuck_channel_times_out_per_attempt() {
        let dispatcher = Dispatcher::new(
            vec![Arc::new(StuckChannel)],
            fast_retry(2),
            Duration::from_millis(10),
        );

        let outcomes = dispatcher.dispatch(&sample_event()).await;

        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].attempts, 2);
        assert!(outcomes[0].last_error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn empty_dispatcher_returns_no_outcomes() {
        let dispatcher = Dispatcher::new(Vec::new(), fast_retry(3), Duration::from_secs(1));
        assert!(dispatcher.is_empty());
        assert!(dispatcher.dispatch(&sample_event()).await.is_empty());
    }
}

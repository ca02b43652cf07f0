//! The check-cycle scheduler.
//!
//! One cycle fans the configured targets out over a bounded pool of
//! concurrent checks. Each check is independent: it fetches the latest
//! release, decides whether it warrants a notification, dispatches, and
//! records state. A failure in one repository is contained to that
//! repository's report, with one exception: an authentication failure is
//! fatal to the whole run, because every subsequent call would fail the
//! same way.
//!
//! # Durability ordering
//!
//! `record_notification` persists before the check completes; `record_check`
//! is batched and flushed once at the end of the cycle. The flush runs even
//! when the cycle terminates early.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::compare::{Decision, should_notify};
use crate::config::Config;
use crate::github::{FetchErrorKind, ReleaseFetcher};
use crate::notify::Dispatcher;
use crate::state::StateStore;
use crate::types::{NotificationEvent, RepositoryTarget};

use super::report::{CheckOutcome, CycleReport, RepoCheckReport};

/// Errors that terminate a scheduler run.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Authentication failed; the run cannot make progress.
    #[error("authentication failed: {0}")]
    Auth(String),
}

/// Result type for scheduler runs.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Drives check cycles over the configured targets.
pub struct Scheduler {
    fetcher: Arc<dyn ReleaseFetcher>,
    store: Arc<StateStore>,
    dispatcher: Arc<Dispatcher>,
    config: Config,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(
        fetcher: Arc<dyn ReleaseFetcher>,
        store: Arc<StateStore>,
        dispatcher: Arc<Dispatcher>,
        config: Config,
        shutdown: CancellationToken,
    ) -> Self {
        Scheduler {
            fetcher,
            store,
            dispatcher,
            config,
            shutdown,
        }
    }

    /// Runs exactly one check cycle and reports what happened.
    ///
    /// An authentication failure cancels the checks still queued and is
    /// recorded in [`CycleReport::fatal`]; everything else is contained to
    /// the affected repository's report.
    pub async fn run_once(&self) -> CycleReport {
        let started_at = Utc::now();
        self.fetcher.begin_cycle().await;

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_checks.max(1)));
        let cycle_token = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for (index, target) in self.config.targets.iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let store = self.store.clone();
            let dispatcher = self.dispatcher.clone();
            let target = target.clone();
            let semaphore = semaphore.clone();
            let cycle_token = cycle_token.clone();

            tasks.spawn(async move {
                let outcome = tokio::select! {
                    _ = cycle_token.cancelled() => CheckOutcome::Aborted,
                    permit = semaphore.acquire() => {
                        // The semaphore is never closed while tasks run.
                        let _permit = permit.expect("semaphore closed");
                        tokio::select! {
                            _ = cycle_token.cancelled() => CheckOutcome::Aborted,
                            outcome = check_repository(
                                fetcher.as_ref(),
                                &store,
                                &dispatcher,
                                &target,
                            ) => outcome,
                        }
                    }
                };
                (
                    index,
                    RepoCheckReport {
                        repo: target.repo,
                        outcome,
                    },
                )
            });
        }

        let mut slots: Vec<Option<RepoCheckReport>> = vec![None; self.config.targets.len()];
        let mut fatal = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => {
                    if report.outcome.is_fatal() && fatal.is_none() {
                        if let CheckOutcome::Failed { message, .. } = &report.outcome {
                            fatal = Some(message.clone());
                        }
                        cycle_token.cancel();
                    }
                    slots[index] = Some(report);
                }
                Err(join_err) => {
                    error!(error = %join_err, "check task failed to complete");
                }
            }
        }

        // Batched check records flush once per cycle, even on early
        // termination.
        if let Err(err) = self.store.flush().await {
            error!(error = %err, "could not flush state after cycle");
        }

        let reports = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| RepoCheckReport {
                    repo: self.config.targets[index].repo.clone(),
                    outcome: CheckOutcome::Aborted,
                })
            })
            .collect();

        CycleReport {
            started_at,
            reports,
            fatal,
        }
    }

    /// Runs cycles on the configured interval until shutdown.
    ///
    /// Terminates early only on a fatal cycle.
    pub async fn run_forever(&self) -> Result<()> {
        loop {
            self.run_and_log().await?;

            let interval = self.jittered_interval();
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("shutdown requested, stopping scheduler");
                    return Ok(());
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Runs one cycle per received tick until the channel closes or
    /// shutdown is requested.
    pub async fn run_scheduled(&self, mut ticks: mpsc::Receiver<()>) -> Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("shutdown requested, stopping scheduler");
                    return Ok(());
                }
                tick = ticks.recv() => match tick {
                    Some(()) => {
                        self.run_and_log().await?;
                    }
                    None => {
                        debug!("tick channel closed, stopping scheduler");
                        return Ok(());
                    }
                },
            }
        }
    }

    async fn run_and_log(&self) -> Result<CycleReport> {
        let report = self.run_once().await;
        info!(
            targets = report.reports.len(),
            notified = report.notified_count(),
            failed = report.failed_count(),
            "check cycle complete"
        );
        if let Some(message) = &report.fatal {
            error!(%message, "cycle terminated the run");
            return Err(SchedulerError::Auth(message.clone()));
        }
        Ok(report)
    }

    /// The sleep between cycles, with deterministic jitter keyed on the
    /// first target.
    fn jittered_interval(&self) -> std::time::Duration {
        match self.config.targets.first() {
            Some(target) => self.config.check_interval_with_jitter(&target.repo),
            None => self.config.check_interval,
        }
    }
}

/// Checks one repository end to end.
#[instrument(skip_all, fields(repo = %target.repo))]
async fn check_repository(
    fetcher: &dyn ReleaseFetcher,
    store: &StateStore,
    dispatcher: &Dispatcher,
    target: &RepositoryTarget,
) -> CheckOutcome {
    if !target.enabled {
        debug!("target disabled, skipping");
        return CheckOutcome::Disabled;
    }

    store.record_check(&target.repo, Utc::now()).await;

    let release = match fetcher.fetch_latest_release(target).await {
        Ok(Some(release)) => release,
        Ok(None) => {
            debug!("no releases published");
            return CheckOutcome::NoReleases;
        }
        Err(err) => {
            let fatal = err.kind == FetchErrorKind::Auth;
            warn!(error = %err, fatal, "release fetch failed");
            return CheckOutcome::Failed {
                message: err.to_string(),
                fatal,
            };
        }
    };

    let last_notified = store.last_notified_version(&target.repo).await;
    match should_notify(last_notified.as_deref(), &release, &target.filter) {
        Decision::Skip(reason) => {
            debug!(version = %release.tag, %reason, "release skipped");
            CheckOutcome::Skipped {
                version: release.tag,
                reason,
            }
        }
        Decision::Notify(version) => {
            info!(%version, "new release detected");
            let event = NotificationEvent::new(target.clone(), release);
            let outcomes = dispatcher.dispatch(&event).await;

            let delivered: Vec<String> = outcomes
                .iter()
                .filter(|o| o.success)
                .map(|o| o.channel_name.clone())
                .collect();

            // The version advances even when every channel failed: dedup
            // must not re-fire the same release forever on a broken channel.
            if let Err(err) = store
                .record_notification(&target.repo, &version, delivered, Utc::now())
                .await
            {
                error!(error = %err, %version, "could not persist notification record");
            }

            CheckOutcome::Notified { version, outcomes }
        }
    }
}

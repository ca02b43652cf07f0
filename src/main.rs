use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tagwatch::config::{Config, RunMode};
use tagwatch::github::ReleaseClient;
use tagwatch::notify::{Dispatcher, FileChannel};
use tagwatch::scheduler::Scheduler;
use tagwatch::state::StateStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    if config.targets.is_empty() {
        tracing::error!("no targets configured; set TAGWATCH_REPOS (comma-separated owner/repo)");
        return ExitCode::FAILURE;
    }

    let fetcher = match build_fetcher(&config) {
        Ok(fetcher) => fetcher,
        Err(err) => {
            tracing::error!(error = %err, "could not construct release client");
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(StateStore::open(&config.state_path));

    let notify_path = std::env::var("TAGWATCH_NOTIFY_PATH")
        .unwrap_or_else(|_| "tagwatch-notifications.jsonl".to_string());
    let channel: Arc<dyn tagwatch::notify::Channel> = Arc::new(FileChannel::new(notify_path));
    let dispatcher = Arc::new(Dispatcher::new(
        vec![channel],
        config.retry,
        config.send_timeout,
    ));

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let mode = config.mode;
    let scheduler = Scheduler::new(fetcher, store, dispatcher, config, shutdown);

    let result = match mode {
        RunMode::Oneshot => {
            let report = scheduler.run_once().await;
            tracing::info!(
                notified = report.notified_count(),
                failed = report.failed_count(),
                "oneshot cycle complete"
            );
            match report.fatal {
                Some(message) => {
                    tracing::error!(%message, "run terminated");
                    Err(())
                }
                None => Ok(()),
            }
        }
        RunMode::Continuous => scheduler.run_forever().await.map_err(|err| {
            tracing::error!(error = %err, "run terminated");
        }),
        RunMode::Scheduled => {
            // Ticks arrive on stdin: one cycle per line.
            let ticks = stdin_ticks();
            scheduler.run_scheduled(ticks).await.map_err(|err| {
                tracing::error!(error = %err, "run terminated");
            })
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}

fn build_fetcher(config: &Config) -> Result<Arc<ReleaseClient>, tagwatch::github::FetchError> {
    let client = match std::env::var("GITHUB_TOKEN") {
        Ok(token) => ReleaseClient::from_token(
            token,
            config.cache_ttl,
            config.rate_limit_max_wait,
            config.fetch_timeout,
            config.retry,
        )?,
        Err(_) => {
            tracing::warn!("GITHUB_TOKEN not set, using anonymous access with its lower quota");
            let octocrab = octocrab::Octocrab::builder()
                .build()
                .map_err(tagwatch::github::FetchError::from_octocrab)?;
            ReleaseClient::new(
                octocrab,
                config.cache_ttl,
                config.rate_limit_max_wait,
                config.fetch_timeout,
                config.retry,
            )
        }
    };
    Ok(Arc::new(client))
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });
}

/// Turns stdin lines into scheduler ticks for scheduled mode.
fn stdin_ticks() -> tokio::sync::mpsc::Receiver<()> {
    use tokio::io::AsyncBufReadExt;

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if tx.send(()).await.is_err() {
                break;
            }
        }
    });
    rx
}

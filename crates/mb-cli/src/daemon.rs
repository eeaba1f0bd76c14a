//! Background updater
//!
//! Performs the first-run refresh, then refreshes the lists and sweeps
//! expired ignore entries on a fixed interval until interrupted. Each tick
//! awaits the previous refresh, so refreshes never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use mb_core::{Blocker, ListFetcher, ListSources};

pub struct DaemonOptions {
    pub sources: ListSources,
    pub interval: Duration,
}

pub fn run_daemon(
    blocker: Arc<Blocker>,
    fetcher: Arc<dyn ListFetcher>,
    opts: DaemonOptions,
) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    let result = runtime.block_on(run_daemon_async(
        Arc::clone(&blocker),
        Arc::clone(&fetcher),
        opts,
    ));
    // Blocking HTTP clients must be dropped outside the runtime.
    drop(runtime);
    drop(fetcher);
    drop(blocker);
    result
}

async fn run_daemon_async(
    blocker: Arc<Blocker>,
    fetcher: Arc<dyn ListFetcher>,
    opts: DaemonOptions,
) -> Result<(), String> {
    let sources = Arc::new(opts.sources);

    {
        let (blocker, fetcher, sources) = (Arc::clone(&blocker), Arc::clone(&fetcher), Arc::clone(&sources));
        let init = tokio::task::spawn_blocking(move || blocker.ensure_initialized(fetcher.as_ref(), &sources))
            .await
            .map_err(|e| format!("Initial refresh task failed: {}", e))?;
        match init {
            Ok(Some(report)) => log::info!(
                "Initial blocklists installed ({} URLs, {} words)",
                report.url_stats.entries,
                report.word_stats.entries
            ),
            Ok(None) => log::info!("Using stored blocklists"),
            Err(e) => log::warn!("Initial refresh failed, will retry on schedule: {e}"),
        }
    }

    log::info!("Refreshing every {}s; press Ctrl-C to stop", opts.interval.as_secs());
    let mut ticker = interval_at(Instant::now() + opts.interval, opts.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (blocker, fetcher, sources) = (Arc::clone(&blocker), Arc::clone(&fetcher), Arc::clone(&sources));
                let tick = tokio::task::spawn_blocking(move || {
                    blocker.refresh_in_background(fetcher.as_ref(), &sources);
                    if let Err(e) = blocker.sweep_ignored() {
                        log::warn!("Ignore sweep failed: {e}");
                    }
                });
                if let Err(e) = tick.await {
                    log::warn!("Scheduled refresh task failed: {e}");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    return Err(format!("Failed to listen for Ctrl-C: {}", e));
                }
                log::info!("Shutting down");
                return Ok(());
            }
        }
    }
}

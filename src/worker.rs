// Background collection worker: one network-stats pass per tick,
// snapshots published on a broadcast channel.

use crate::compute_repo::ComputeRepo;
use crate::models::NetworkSnapshot;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio::time::{Duration, Instant, interval};

/// Rate limit for "no receivers" logging (avoid a line per tick when no
/// consumer is subscribed).
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Repo, channels, and shutdown for the worker.
pub struct WorkerDeps {
    pub compute_repo: Arc<ComputeRepo>,
    pub tx: broadcast::Sender<NetworkSnapshot>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Worker timing and logging config. Stats logging uses a real-time
/// interval, independent of sample_interval_ms.
pub struct WorkerConfig {
    pub sample_interval_ms: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        compute_repo,
        tx,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        sample_interval_ms,
        stats_log_interval_secs,
    } = config;

    let stats_log_interval = Duration::from_secs(stats_log_interval_secs);

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(sample_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut passes_total: u64 = 0;
        let mut passes_failed_total: u64 = 0;
        let mut containers_last_pass: usize = 0;
        let mut last_no_receivers_warn: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    passes_total += 1;
                    let containers = match compute_repo.collect_network_stats().await {
                        Ok(c) => c,
                        Err(e) => {
                            // Enumeration outage fails the whole pass; the
                            // next tick retries.
                            passes_failed_total += 1;
                            tracing::warn!(
                                error = %e,
                                operation = "collect_network_stats",
                                "collection pass failed"
                            );
                            continue;
                        }
                    };
                    containers_last_pass = containers.len();

                    let timestamp = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_millis() as u64)
                        .unwrap_or_else(|e| {
                            tracing::warn!(
                                error = %e,
                                operation = "get_timestamp",
                                "system time error"
                            );
                            0
                        });

                    let snapshot = NetworkSnapshot { timestamp, containers };
                    if tx.send(snapshot).is_err() {
                        let should_warn = last_no_receivers_warn
                            .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
                        if should_warn {
                            tracing::debug!(
                                operation = "broadcast_snapshot",
                                "No subscribers; broadcast channel has no receivers"
                            );
                            last_no_receivers_warn = Some(Instant::now());
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        passes_total,
                        passes_failed_total,
                        containers_last_pass,
                        "app stats"
                    );
                }
            }
        }
    })
}

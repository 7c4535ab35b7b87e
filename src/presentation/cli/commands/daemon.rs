use std::time::Duration;

use anyhow::Context;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::services::retention;
use crate::application::services::scanner::Scanner;
use crate::domain::ports::clock::Clock;
use crate::domain::value_objects::RetentionPolicy;
use crate::infrastructure::persistence::composite::EventStoreSet;

/// How often the daemon scans and prunes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub scan_interval: Duration,
    pub cleanup_interval: Duration,
}

/// Cancel `token` on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
pub fn spawn_shutdown_listener(token: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received, stopping after the current service");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Cannot install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Run the scan/cleanup loop until `cancel` fires.
///
/// An initial scan runs immediately; after that scans and cleanups run on
/// their own intervals. Both run in this task, so they never overlap. Overdue
/// ticks are skipped rather than replayed.
///
/// # Errors
///
/// Returns an error if an interval cannot be scheduled. Per-service and
/// per-store failures are logged and never end the loop.
pub async fn run_daemon(
    scanner: &mut Scanner<'_>,
    stores: &EventStoreSet,
    retention_policy: RetentionPolicy,
    clock: &dyn Clock,
    schedule: Schedule,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!(
        "Daemon started: scan every {}s, cleanup every {}s",
        schedule.scan_interval.as_secs(),
        schedule.cleanup_interval.as_secs()
    );

    scanner.scan_once(&cancel).await;

    let start = Instant::now();
    let first_scan = start
        .checked_add(schedule.scan_interval)
        .context("scan interval is too large to schedule")?;
    let first_cleanup = start
        .checked_add(schedule.cleanup_interval)
        .context("cleanup interval is too large to schedule")?;
    let mut scan_tick = tokio::time::interval_at(first_scan, schedule.scan_interval);
    scan_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cleanup_tick = tokio::time::interval_at(first_cleanup, schedule.cleanup_interval);
    cleanup_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::info!("Daemon stopped");
                break;
            }
            _ = scan_tick.tick() => {
                scanner.scan_once(&cancel).await;
            }
            _ = cleanup_tick.tick() => {
                retention::cleanup(stores, retention_policy, clock.now()).await;
            }
        }
    }
    Ok(())
}

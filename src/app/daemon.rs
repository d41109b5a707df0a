// LogSleuth - app/daemon.rs
//
// Continuous detection-cycle daemon (§11 "Continuous detection-cycle daemon
// mode"): runs one detection cycle immediately and, when `interval` is set,
// loops running another cycle every `interval` until the process is told to
// stop. Mirrors the background-thread-plus-interval pattern used elsewhere
// in this codebase for long-running work, adapted to a tokio interval
// timer since this runs alongside the async HTTP listener rather than on
// its own OS thread.

use crate::anomaly::run_detection_cycle;
use crate::storage::StorageAdapter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Run one detection cycle now, then (if `interval` is `Some`) keep running
/// one every `interval` until `shutdown` fires.
pub async fn run(storage: Arc<dyn StorageAdapter>, interval: Option<Duration>, mut shutdown: watch::Receiver<bool>) {
    run_cycle(&storage).await;

    let Some(interval) = interval else {
        return;
    };

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; we already ran one cycle above.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_cycle(&storage).await;
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!(target: "logsleuth::daemon", "detection-cycle daemon stopping");
                    return;
                }
            }
        }
    }
}

async fn run_cycle(storage: &Arc<dyn StorageAdapter>) {
    let started = std::time::Instant::now();
    let emitted = run_detection_cycle(storage.clone(), chrono::Utc::now()).await;
    tracing::debug!(
        target: "logsleuth::daemon",
        anomalies = emitted.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "detection cycle completed"
    );
}

// LogSleuth - anomaly/detector.rs
//
// Orchestrates one detection cycle: pulls a window of records and runs all
// six strategies in sequence (§4.H). Each strategy is fault-isolated — a
// strategy error is logged and skipped, never aborting the cycle
// (`cycle_error`, §7).

use crate::core::model::Anomaly;
use crate::storage::StorageAdapter;
use crate::util::constants::DEFAULT_DETECTION_WINDOW_HOURS;
use crate::util::error::AnomalyError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Shared context every strategy receives: the storage adapter and the
/// window boundaries for this cycle.
pub struct DetectionContext {
    pub storage: Arc<dyn StorageAdapter>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl DetectionContext {
    pub fn for_window(storage: Arc<dyn StorageAdapter>, now: DateTime<Utc>, window_hours: i64) -> Self {
        Self {
            storage,
            window_start: now - Duration::hours(window_hours),
            window_end: now,
        }
    }
}

/// Capability every detection strategy implements (§9 "Polymorphism").
#[async_trait]
pub trait AnomalyStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, ctx: &DetectionContext) -> Result<Vec<Anomaly>, AnomalyError>;
}

fn strategies() -> Vec<Box<dyn AnomalyStrategy>> {
    vec![
        Box::new(super::volume::VolumeStrategy),
        Box::new(super::error_rate::ErrorRateStrategy),
        Box::new(super::new_template::NewTemplateStrategy),
        Box::new(super::rare_template::RareTemplateStrategy),
        Box::new(super::ml_outlier::MlOutlierStrategy),
        Box::new(super::source_silence::SourceSilenceStrategy),
    ]
}

/// Run one detection cycle over the default (or caller-supplied) window,
/// persisting every anomaly each strategy emits. Returns the anomalies
/// written, for callers (the HTTP trigger endpoint, the daemon loop) that
/// want to report what happened.
pub async fn run_detection_cycle(
    storage: Arc<dyn StorageAdapter>,
    now: DateTime<Utc>,
) -> Vec<Anomaly> {
    let ctx = DetectionContext::for_window(storage.clone(), now, DEFAULT_DETECTION_WINDOW_HOURS);
    let mut emitted = Vec::new();

    for strategy in strategies() {
        match strategy.run(&ctx).await {
            Ok(anomalies) => {
                for anomaly in anomalies {
                    tracing::info!(
                        target: "logsleuth::anomaly",
                        strategy = strategy.name(),
                        kind = ?anomaly.kind,
                        "anomaly detected"
                    );
                    match storage.insert_anomaly(anomaly).await {
                        Ok(persisted) => emitted.push(persisted),
                        Err(err) => {
                            tracing::warn!(target: "logsleuth::anomaly", %err, "failed to persist anomaly");
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: "logsleuth::anomaly",
                    strategy = strategy.name(),
                    %err,
                    "detection strategy failed, continuing with remaining strategies"
                );
            }
        }
    }

    emitted
}

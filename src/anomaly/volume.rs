// LogSleuth - anomaly/volume.rs
//
// Volume strategy (§4.H.1): rolling z-score over hourly record counts.

use super::detector::{AnomalyStrategy, DetectionContext};
use super::support::{fill_hourly_gaps, mean, std_dev};
use crate::core::model::{Anomaly, AnomalyKind, AnomalySeverity};
use crate::util::constants::{
    VOLUME_ROLLING_WINDOW_HOURS, VOLUME_Z_SCORE_EPSILON, VOLUME_Z_SCORE_HIGH_THRESHOLD,
    VOLUME_Z_SCORE_THRESHOLD,
};
use crate::util::error::AnomalyError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;

pub struct VolumeStrategy;

#[async_trait]
impl AnomalyStrategy for VolumeStrategy {
    fn name(&self) -> &'static str {
        "volume"
    }

    async fn run(&self, ctx: &DetectionContext) -> Result<Vec<Anomaly>, AnomalyError> {
        let raw = ctx
            .storage
            .aggregate_hourly(ctx.window_start, ctx.window_end, false, false)
            .await
            .map_err(|source| AnomalyError::WindowUnavailable {
                strategy: self.name(),
                source,
            })?;
        let buckets = fill_hourly_gaps(raw, ctx.window_start, ctx.window_end);

        let mut anomalies = Vec::new();
        for i in 0..buckets.len() {
            let window = VOLUME_ROLLING_WINDOW_HOURS.min(i as i64) as usize;
            if window == 0 {
                continue;
            }
            let prior: Vec<f64> = buckets[i - window..i].iter().map(|b| b.count as f64).collect();
            let m = mean(&prior);
            let sd = std_dev(&prior, m);
            let current = buckets[i].count as f64;
            let z = (current - m) / (sd + VOLUME_Z_SCORE_EPSILON);

            if z.abs() > VOLUME_Z_SCORE_THRESHOLD {
                let kind = if z > 0.0 {
                    AnomalyKind::VolumeSpike
                } else {
                    AnomalyKind::VolumeDrop
                };
                let severity = if z.abs() > VOLUME_Z_SCORE_HIGH_THRESHOLD {
                    AnomalySeverity::High
                } else {
                    AnomalySeverity::Medium
                };
                let mut details = HashMap::new();
                details.insert("z_score".to_string(), serde_json::json!(z));
                details.insert("mean".to_string(), serde_json::json!(m));
                details.insert("std_dev".to_string(), serde_json::json!(sd));

                anomalies.push(Anomaly {
                    id: None,
                    event_time: buckets[i].bucket_start,
                    kind,
                    severity,
                    description: format!(
                        "hourly record count {current} deviates from rolling mean {m:.1} (z={z:.2})"
                    ),
                    affected_templates: Vec::new(),
                    log_count: buckets[i].count,
                    score: z,
                    details,
                    created_at: Utc::now(),
                });
            }
        }

        Ok(anomalies)
    }
}

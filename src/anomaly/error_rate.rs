// LogSleuth - anomaly/error_rate.rs
//
// Error-rate strategy (§4.H.2): flags hours whose error-like fraction is
// both above an absolute floor and a surge relative to earlier buckets.

use super::detector::{AnomalyStrategy, DetectionContext};
use super::support::{fill_hourly_gaps, mean};
use crate::core::model::{Anomaly, AnomalyKind, AnomalySeverity};
use crate::util::constants::{
    ERROR_RATE_CRITICAL_THRESHOLD, ERROR_RATE_MIN_THRESHOLD, ERROR_RATE_SURGE_MULTIPLIER,
};
use crate::util::error::AnomalyError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;

pub struct ErrorRateStrategy;

#[async_trait]
impl AnomalyStrategy for ErrorRateStrategy {
    fn name(&self) -> &'static str {
        "error_rate"
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

        let rates: Vec<f64> = buckets
            .iter()
            .map(|b| if b.count == 0 { 0.0 } else { b.error_count as f64 / b.count as f64 })
            .collect();

        let mut anomalies = Vec::new();
        for i in 0..buckets.len() {
            if i == 0 {
                continue;
            }
            let rate = rates[i];
            let earlier_mean = mean(&rates[..i]);
            if rate > ERROR_RATE_MIN_THRESHOLD && rate > ERROR_RATE_SURGE_MULTIPLIER * earlier_mean {
                let severity = if rate > ERROR_RATE_CRITICAL_THRESHOLD {
                    AnomalySeverity::Critical
                } else {
                    AnomalySeverity::High
                };
                let mut details = HashMap::new();
                details.insert("error_rate".to_string(), serde_json::json!(rate));
                details.insert("earlier_mean_rate".to_string(), serde_json::json!(earlier_mean));

                anomalies.push(Anomaly {
                    id: None,
                    event_time: buckets[i].bucket_start,
                    kind: AnomalyKind::HighErrorRate,
                    severity,
                    description: format!(
                        "error rate {:.1}% exceeds {:.0}x the earlier mean of {:.1}%",
                        rate * 100.0,
                        ERROR_RATE_SURGE_MULTIPLIER,
                        earlier_mean * 100.0
                    ),
                    affected_templates: Vec::new(),
                    log_count: buckets[i].error_count,
                    score: rate,
                    details,
                    created_at: Utc::now(),
                });
            }
        }

        Ok(anomalies)
    }
}

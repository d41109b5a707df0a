// LogSleuth - anomaly/rare_template.rs
//
// Rare-template activity strategy (§4.H.4): templates that are rare over a
// long historical baseline but reactivate sharply in the recent window.

use super::detector::{AnomalyStrategy, DetectionContext};
use super::support::percentile;
use crate::core::model::{Anomaly, AnomalyKind, AnomalySeverity};
use crate::util::constants::{
    RARE_TEMPLATE_HISTORY_DAYS, RARE_TEMPLATE_PERCENTILE, RARE_TEMPLATE_REACTIVATION_MULTIPLIER,
    RARE_TEMPLATE_RECENT_HOURS,
};
use crate::util::error::AnomalyError;
use chrono::{Duration, Utc};
use std::collections::HashMap;

use async_trait::async_trait;

pub struct RareTemplateStrategy;

#[async_trait]
impl AnomalyStrategy for RareTemplateStrategy {
    fn name(&self) -> &'static str {
        "rare_template_activity"
    }

    async fn run(&self, ctx: &DetectionContext) -> Result<Vec<Anomaly>, AnomalyError> {
        let history_start = ctx.window_end - Duration::days(RARE_TEMPLATE_HISTORY_DAYS);
        let buckets = ctx
            .storage
            .aggregate_hourly(history_start, ctx.window_end, false, true)
            .await
            .map_err(|source| AnomalyError::WindowUnavailable {
                strategy: self.name(),
                source,
            })?;

        let mut totals: HashMap<String, u64> = HashMap::new();
        for bucket in &buckets {
            if let Some(ref template_id) = bucket.template_id {
                *totals.entry(template_id.clone()).or_insert(0) += bucket.count;
            }
        }

        if totals.is_empty() {
            return Ok(Vec::new());
        }

        let counts: Vec<f64> = totals.values().map(|c| *c as f64).collect();
        let rare_threshold = percentile(&counts, RARE_TEMPLATE_PERCENTILE);

        let recent_start = ctx.window_end - Duration::hours(RARE_TEMPLATE_RECENT_HOURS);
        let mut anomalies = Vec::new();

        for (template_id, &total) in totals.iter() {
            if total as f64 > rare_threshold {
                continue;
            }
            let recent_count = ctx
                .storage
                .count_records_for_template(template_id, recent_start)
                .await
                .map_err(|source| AnomalyError::WindowUnavailable {
                    strategy: self.name(),
                    source,
                })?;

            if (recent_count as f64) > RARE_TEMPLATE_REACTIVATION_MULTIPLIER * rare_threshold {
                let mut details = HashMap::new();
                details.insert("rare_threshold".to_string(), serde_json::json!(rare_threshold));
                details.insert("historical_total".to_string(), serde_json::json!(total));

                anomalies.push(Anomaly {
                    id: None,
                    event_time: ctx.window_end,
                    kind: AnomalyKind::RareTemplateActivity,
                    severity: AnomalySeverity::Medium,
                    description: format!(
                        "rare template '{template_id}' reactivated: {recent_count} occurrences in the last {RARE_TEMPLATE_RECENT_HOURS}h vs a rarity threshold of {rare_threshold:.1}"
                    ),
                    affected_templates: vec![template_id.clone()],
                    log_count: recent_count,
                    score: recent_count as f64,
                    details,
                    created_at: Utc::now(),
                });
            }
        }

        Ok(anomalies)
    }
}

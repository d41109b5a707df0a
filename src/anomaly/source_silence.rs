// LogSleuth - anomaly/source_silence.rs
//
// Source-silence strategy (§4.H.6): a source that was reliably active goes
// quiet for the most recent hours of the window.

use super::detector::{AnomalyStrategy, DetectionContext};
use super::support::{fill_hourly_gaps, mean};
use crate::core::model::{Anomaly, AnomalyKind, AnomalySeverity};
use crate::util::constants::{SOURCE_SILENCE_MIN_PRIOR_MEAN, SOURCE_SILENCE_RECENT_HOURS};
use crate::util::error::AnomalyError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};

pub struct SourceSilenceStrategy;

#[async_trait]
impl AnomalyStrategy for SourceSilenceStrategy {
    fn name(&self) -> &'static str {
        "source_silence"
    }

    async fn run(&self, ctx: &DetectionContext) -> Result<Vec<Anomaly>, AnomalyError> {
        let raw = ctx
            .storage
            .aggregate_hourly(ctx.window_start, ctx.window_end, true, false)
            .await
            .map_err(|source| AnomalyError::WindowUnavailable {
                strategy: self.name(),
                source,
            })?;

        let sources: HashSet<String> = raw.iter().filter_map(|b| b.source.clone()).collect();

        let mut anomalies = Vec::new();
        for source in sources {
            let per_source: Vec<_> = raw.iter().filter(|b| b.source.as_deref() == Some(source.as_str())).cloned().collect();
            let filled = fill_hourly_gaps(per_source, ctx.window_start, ctx.window_end);
            if filled.len() <= SOURCE_SILENCE_RECENT_HOURS as usize {
                continue;
            }

            let split = filled.len() - SOURCE_SILENCE_RECENT_HOURS as usize;
            let (prior, recent) = filled.split_at(split);

            let recent_total: u64 = recent.iter().map(|b| b.count).sum();
            if recent_total != 0 {
                continue;
            }

            let prior_counts: Vec<f64> = prior.iter().map(|b| b.count as f64).collect();
            let prior_mean = mean(&prior_counts);
            if prior_mean <= SOURCE_SILENCE_MIN_PRIOR_MEAN {
                continue;
            }

            let mut details = HashMap::new();
            details.insert("prior_mean".to_string(), serde_json::json!(prior_mean));
            details.insert("recent_hours".to_string(), serde_json::json!(SOURCE_SILENCE_RECENT_HOURS));

            anomalies.push(Anomaly {
                id: None,
                event_time: ctx.window_end,
                kind: AnomalyKind::SourceSilence,
                severity: AnomalySeverity::Medium,
                description: format!(
                    "source '{source}' produced no logs in the last {SOURCE_SILENCE_RECENT_HOURS}h despite an hourly mean of {prior_mean:.1} before that"
                ),
                affected_templates: Vec::new(),
                log_count: 0,
                score: prior_mean,
                details,
                created_at: Utc::now(),
            });
        }

        Ok(anomalies)
    }
}

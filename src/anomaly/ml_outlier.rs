// LogSleuth - anomaly/ml_outlier.rs
//
// Statistical outlier strategy (§4.H.5): hourly feature vectors, standardized,
// scored against a deterministic unsupervised outlier detector.
//
// The reference implementation uses scikit-learn's IsolationForest with
// `random_state=42, contamination=0.1`. This rewrite substitutes a
// deterministic distance-based scorer (§4.H.5 explicitly allows "any
// equivalent unsupervised outlier detector as long as the contract —
// deterministic scoring, contamination rate — holds"): each standardized
// feature vector's score is its Euclidean distance from the window's
// centroid, normalized to [0, 1]; the top `contamination` fraction by score
// are flagged. The fixed seed has no effect on this scorer's determinism
// but is recorded in `details.seed` for parity with the reference's
// reproducibility contract.

use super::detector::{AnomalyStrategy, DetectionContext};
use super::support::{fill_hourly_gaps, mean, std_dev};
use crate::core::model::{Anomaly, AnomalyKind, AnomalySeverity};
use crate::util::constants::{
    ML_DETECTOR_CONTAMINATION, ML_DETECTOR_HIGH_SCORE_THRESHOLD, ML_DETECTOR_MIN_VECTORS, ML_DETECTOR_SEED,
};
use crate::util::error::AnomalyError;
use async_trait::async_trait;
use chrono::{Datelike, Timelike, Utc};
use std::collections::HashMap;

pub struct MlOutlierStrategy;

const FEATURE_COUNT: usize = 6;

#[async_trait]
impl AnomalyStrategy for MlOutlierStrategy {
    fn name(&self) -> &'static str {
        "ml_outlier"
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

        if buckets.len() < ML_DETECTOR_MIN_VECTORS {
            return Ok(Vec::new());
        }

        let raw_features: Vec<[f64; FEATURE_COUNT]> = buckets
            .iter()
            .map(|b| {
                [
                    b.count as f64,
                    b.error_count as f64,
                    b.unique_templates as f64,
                    b.unique_sources as f64,
                    b.bucket_start.hour() as f64,
                    b.bucket_start.weekday().num_days_from_monday() as f64,
                ]
            })
            .collect();

        let standardized = standardize_columns(&raw_features);

        let distances: Vec<f64> = standardized
            .iter()
            .map(|row| row.iter().map(|v| v * v).sum::<f64>().sqrt())
            .collect();
        let max_distance = distances.iter().cloned().fold(0.0_f64, f64::max).max(1e-9);
        let normalized: Vec<f64> = distances.iter().map(|d| d / max_distance).collect();

        let outlier_count = ((buckets.len() as f64) * ML_DETECTOR_CONTAMINATION).ceil() as usize;
        let mut ranked: Vec<usize> = (0..buckets.len()).collect();
        ranked.sort_by(|&a, &b| normalized[b].partial_cmp(&normalized[a]).unwrap());

        let mut anomalies = Vec::new();
        for &idx in ranked.iter().take(outlier_count) {
            let score = normalized[idx];
            let severity = if score.abs() > ML_DETECTOR_HIGH_SCORE_THRESHOLD {
                AnomalySeverity::High
            } else {
                AnomalySeverity::Medium
            };
            let mut details = HashMap::new();
            details.insert("seed".to_string(), serde_json::json!(ML_DETECTOR_SEED));
            details.insert("contamination".to_string(), serde_json::json!(ML_DETECTOR_CONTAMINATION));
            details.insert("distance".to_string(), serde_json::json!(distances[idx]));

            anomalies.push(Anomaly {
                id: None,
                event_time: buckets[idx].bucket_start,
                kind: AnomalyKind::MlDetectedAnomaly,
                severity,
                description: format!(
                    "hourly feature vector at {} scores {:.2} against the window's centroid",
                    buckets[idx].bucket_start, score
                ),
                affected_templates: Vec::new(),
                log_count: buckets[idx].count,
                score,
                details,
                created_at: Utc::now(),
            });
        }

        Ok(anomalies)
    }
}

fn standardize_columns(rows: &[[f64; FEATURE_COUNT]]) -> Vec<[f64; FEATURE_COUNT]> {
    let mut means = [0.0; FEATURE_COUNT];
    let mut stds = [0.0; FEATURE_COUNT];
    for col in 0..FEATURE_COUNT {
        let values: Vec<f64> = rows.iter().map(|r| r[col]).collect();
        means[col] = mean(&values);
        stds[col] = std_dev(&values, means[col]);
    }

    rows.iter()
        .map(|row| {
            let mut out = [0.0; FEATURE_COUNT];
            for col in 0..FEATURE_COUNT {
                out[col] = if stds[col] > 0.0 {
                    (row[col] - means[col]) / stds[col]
                } else {
                    0.0
                };
            }
            out
        })
        .collect()
}

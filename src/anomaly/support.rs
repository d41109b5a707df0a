// LogSleuth - anomaly/support.rs
//
// Small helpers shared across detection strategies: filling hourly gaps so
// rolling statistics see a contiguous series, and basic descriptive stats.

use crate::storage::HourlyBucket;
use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::HashMap;

/// Returns one bucket per hour in `[start, end)`, inserting zero-valued
/// buckets for hours `aggregate_hourly` returned no row for. Strategies
/// need a contiguous series for rolling-window statistics to mean what
/// they say.
pub fn fill_hourly_gaps(buckets: Vec<HourlyBucket>, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<HourlyBucket> {
    let by_hour: HashMap<DateTime<Utc>, HourlyBucket> =
        buckets.into_iter().map(|b| (b.bucket_start, b)).collect();

    let mut out = Vec::new();
    let mut cursor = floor_to_hour(start);
    let end = floor_to_hour(end);
    while cursor <= end {
        let bucket = by_hour.get(&cursor).cloned().unwrap_or(HourlyBucket {
            bucket_start: cursor,
            count: 0,
            error_count: 0,
            unique_templates: 0,
            unique_sources: 0,
            source: None,
            template_id: None,
        });
        out.push(bucket);
        cursor += Duration::hours(1);
    }
    out
}

fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts - Duration::minutes(ts.minute() as i64)
        - Duration::seconds(ts.second() as i64)
        - Duration::nanoseconds(ts.nanosecond() as i64)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64], mean_value: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Linear-interpolated percentile (0.0-1.0) of a sorted-in-place copy of
/// `values`. Returns 0.0 for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_of_single_value_is_itself() {
        assert_eq!(percentile(&[5.0], 0.05), 5.0);
    }

    #[test]
    fn percentile_fifth_of_sorted_values() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let p5 = percentile(&values, 0.05);
        assert!((p5 - 5.95).abs() < 0.01);
    }

    #[test]
    fn fill_hourly_gaps_produces_contiguous_series() {
        let start = Utc::now() - Duration::hours(3);
        let end = Utc::now();
        let filled = fill_hourly_gaps(Vec::new(), start, end);
        assert!(filled.len() >= 3);
        for bucket in &filled {
            assert_eq!(bucket.count, 0);
        }
    }
}

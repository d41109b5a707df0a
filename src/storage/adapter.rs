// LogSleuth - storage/adapter.rs
//
// The `StorageAdapter` trait: the one seam between the domain layers (core,
// anomaly, http) and any concrete persistence backend. Required indices
// (§6): logs(timestamp desc), logs(template_id), logs(file_id),
// logs(severity), logs(source); anomalies(timestamp desc),
// anomalies(severity); files(file_id). Enforced by whichever backend
// implements this trait, not by callers.

use crate::core::filter::QueryFilter;
use crate::core::model::{Anomaly, FileUpload, FileUploadStatus, LogRecord, Template};
use crate::util::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Partial update applied to a `FileUpload` row (§4.F `update_file`).
#[derive(Debug, Clone, Default)]
pub struct FileUpdate {
    pub status: Option<FileUploadStatus>,
    pub processed_logs_delta: u64,
    pub failed_logs_delta: u64,
    pub error: Option<String>,
}

/// One bucket of an hourly aggregation, as the anomaly strategies need it
/// (§4.H). `template_id`/`source` are `None` when the bucket aggregates
/// across all templates/sources rather than grouping by one.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyBucket {
    pub bucket_start: DateTime<Utc>,
    pub count: u64,
    pub error_count: u64,
    pub unique_templates: u64,
    pub unique_sources: u64,
    pub source: Option<String>,
    pub template_id: Option<String>,
}

/// Global statistics bundle backing `/api/stats` (§4.G). Computed in one
/// adapter call rather than several round-trips from the caller.
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub total_records: u64,
    pub total_templates: u64,
    pub total_files: u64,
    pub severity_histogram: HashMap<String, u64>,
    pub top_sources: Vec<(String, u64)>,
    pub format_tag_histogram: HashMap<String, u64>,
    pub top_files: Vec<(String, u64)>,
    pub network_presence_count: u64,
}

/// Per-file statistics bundle backing `/api/files/{file_id}/stats` (§4.G).
#[derive(Debug, Clone, Default)]
pub struct FileStatsSummary {
    pub total_records: u64,
    pub severity_histogram: HashMap<String, u64>,
    pub format_tag_histogram: HashMap<String, u64>,
    pub network_presence_count: u64,
    pub earliest_event_time: Option<DateTime<Utc>>,
    pub latest_event_time: Option<DateTime<Utc>>,
}

/// Storage adapter over the persisted `logs`, `templates`, `files`, and
/// `anomalies` collections (§4.F, §6 "Persisted state layout").
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Insert one record, returning it with `id` populated.
    async fn insert_record(&self, record: LogRecord) -> Result<LogRecord, StorageError>;

    /// Atomically create-or-bump a template: increments `count`, advances
    /// `last_seen`, and sets `first_seen` only on first insert (§8 property
    /// 6: idempotent upsert).
    async fn upsert_template(
        &self,
        template_id: &str,
        template_string: &str,
        event_time: DateTime<Utc>,
    ) -> Result<Template, StorageError>;

    async fn list_templates(&self) -> Result<Vec<Template>, StorageError>;

    async fn insert_file(&self, file: FileUpload) -> Result<FileUpload, StorageError>;

    async fn update_file(&self, file_id: &str, update: FileUpdate) -> Result<(), StorageError>;

    async fn get_file(&self, file_id: &str) -> Result<Option<FileUpload>, StorageError>;

    async fn list_files(&self) -> Result<Vec<FileUpload>, StorageError>;

    /// Returns the matching page plus the total count of matches before
    /// `limit`/`offset` were applied (§6 query response shape).
    async fn find_records(&self, filter: &QueryFilter) -> Result<(Vec<LogRecord>, u64), StorageError>;

    /// Hourly buckets over `[start, end)`, optionally grouped by `source` or
    /// by `template_id` (mutually exclusive; `None` aggregates across all).
    /// Backs every §4.H strategy.
    async fn aggregate_hourly(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        group_by_source: bool,
        group_by_template: bool,
    ) -> Result<Vec<HourlyBucket>, StorageError>;

    async fn insert_anomaly(&self, anomaly: Anomaly) -> Result<Anomaly, StorageError>;

    async fn list_anomalies(&self, since: DateTime<Utc>) -> Result<Vec<Anomaly>, StorageError>;

    /// Total record count for a given source across all time; used by the
    /// rare-template strategy's historical baseline lookups and by
    /// `/api/files/{id}/stats`.
    async fn count_records_for_template(&self, template_id: &str, since: DateTime<Utc>) -> Result<u64, StorageError>;

    /// Global statistics for `/api/stats` (§4.G), capped to `top_n` entries
    /// per ranking.
    async fn stats_summary(&self, top_n: usize) -> Result<StatsSummary, StorageError>;

    /// Per-file statistics for `/api/files/{file_id}/stats` (§4.G). `None`
    /// when the file has no records (distinct from the file not existing,
    /// which the caller checks via `get_file`).
    async fn file_stats_summary(&self, file_id: &str) -> Result<FileStatsSummary, StorageError>;
}

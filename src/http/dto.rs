// LogSleuth - http/dto.rs
//
// Wire-level request/response shapes for the HTTP surface (§6). Kept
// separate from `core::model` so the persisted/domain types can evolve
// without churning the API contract, and so `core` stays free of any
// HTTP-framework dependency.

use crate::core::filter::QueryFilter;
use crate::core::model::{Anomaly, FileUpload, LogRecord, Severity, Template};
use crate::util::constants::DEFAULT_QUERY_LIMIT;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// POST /api/logs/upload
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
    pub processed_logs: u64,
    pub failed_logs: u64,
    pub file_size: u64,
}

// =============================================================================
// POST /api/logs/ingest
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub level: Option<String>,
    pub message: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub log_id: String,
    pub template_id: String,
    pub template: String,
}

// =============================================================================
// POST /api/logs/ingest/fluent-bit
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FluentBitRecord {
    pub log: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FluentBitResponse {
    pub received: u64,
    pub processed: u64,
    pub failed: u64,
}

// =============================================================================
// POST /api/logs/query
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub format_tag: Option<String>,
    #[serde(default)]
    pub has_network_info: Option<bool>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

impl QueryRequest {
    /// Translate the wire shape into the core `QueryFilter`. `level` is
    /// resolved through `Severity::from_label`; an unrecognised value is
    /// simply dropped rather than rejected, matching a tolerant query API.
    pub fn into_filter(self) -> QueryFilter {
        QueryFilter {
            template_id: self.template_id,
            start_time: self.start_time,
            end_time: self.end_time,
            level: self.level.as_deref().and_then(Severity::from_label),
            source: self.source,
            message: self.message,
            file_id: self.file_id,
            format_tag: self.format_tag,
            has_network_info: self.has_network_info,
            protocol: self.protocol,
            ip_address: self.ip_address,
            limit: self.limit.unwrap_or(DEFAULT_QUERY_LIMIT),
            offset: self.offset.unwrap_or(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub logs: Vec<LogRecord>,
    pub total_count: u64,
    pub returned_count: u64,
    pub offset: u64,
    pub limit: u64,
}

// =============================================================================
// GET /api/templates
// =============================================================================

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub templates: Vec<Template>,
}

// =============================================================================
// GET /api/stats
// =============================================================================

#[derive(Debug, Serialize, Default)]
pub struct StatsResponse {
    pub total_records: u64,
    pub total_templates: u64,
    pub total_files: u64,
    pub severity_histogram: HashMap<String, u64>,
    pub top_sources: Vec<CountEntry>,
    pub format_tag_histogram: HashMap<String, u64>,
    pub top_files: Vec<CountEntry>,
    pub hourly_activity: Vec<HourlyActivity>,
    pub network_presence_count: u64,
}

#[derive(Debug, Serialize)]
pub struct CountEntry {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct HourlyActivity {
    pub bucket_start: DateTime<Utc>,
    pub count: u64,
}

// =============================================================================
// GET /api/files, GET /api/files/{file_id}/stats
// =============================================================================

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileUpload>,
}

/// Richer per-file stats shape (§9 Open Question decision: the later,
/// richer definition wins).
#[derive(Debug, Serialize)]
pub struct FileStatsResponse {
    pub file_id: String,
    pub total_records: u64,
    pub severity_histogram: HashMap<String, u64>,
    pub format_tag_histogram: HashMap<String, u64>,
    pub network_presence_count: u64,
    pub earliest_event_time: Option<DateTime<Utc>>,
    pub latest_event_time: Option<DateTime<Utc>>,
}

// =============================================================================
// GET /api/health
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// GET /
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RootInfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub routes: Vec<&'static str>,
}

// =============================================================================
// GET /api/anomalies (detection-cycle results; supplemental convenience)
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AnomalyListResponse {
    pub anomalies: Vec<Anomaly>,
}

/// Shared error body shape returned for `bad_input`/`storage_unavailable`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

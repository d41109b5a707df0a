// LogSleuth - http/handlers.rs
//
// Route handlers for the HTTP surface (§6). Thin marshalling over the
// ingestion pipeline (`app::ingest`), the anomaly detector, and the storage
// adapter; no domain logic lives here beyond translating wire shapes.

use crate::app::ingest::{ingest_line, IngestLine};
use crate::app::state::AppState;
use crate::core::model::{FileUpload, FileUploadStatus, Severity};
use crate::http::dto::{
    AnomalyListResponse, CountEntry, ErrorResponse, FileListResponse, FileStatsResponse, FluentBitRecord,
    FluentBitResponse, HealthResponse, HourlyActivity, IngestRequest, IngestResponse, QueryRequest, QueryResponse,
    RootInfoResponse, StatsResponse, TemplateResponse, UploadResponse,
};
use crate::storage::FileUpdate;
use crate::util::constants::{
    ALLOWED_UPLOAD_EXTENSIONS, APP_NAME, APP_VERSION, DEFAULT_DETECTION_WINDOW_HOURS, DEFAULT_FLUENT_BIT_SOURCE,
    MAX_QUERY_LIMIT, MAX_UPLOAD_BYTES, STATS_TOP_N, UPLOADS_DIR_NAME,
};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

/// Uniform error response: `bad_input` → 400, `storage_unavailable` → 503
/// (§7, §10.2).
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_input(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn storage_unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

impl From<crate::util::error::StorageError> for ApiError {
    fn from(err: crate::util::error::StorageError) -> Self {
        ApiError::storage_unavailable(err.to_string())
    }
}

// =============================================================================
// GET /
// =============================================================================

pub async fn root_info() -> Json<RootInfoResponse> {
    Json(RootInfoResponse {
        name: APP_NAME,
        version: APP_VERSION,
        description: "Log ingestion, template-mining, and anomaly-detection service",
        routes: vec![
            "POST /api/logs/upload",
            "POST /api/logs/ingest",
            "POST /api/logs/ingest/fluent-bit",
            "POST /api/logs/query",
            "GET /api/templates",
            "GET /api/stats",
            "GET /api/files",
            "GET /api/files/{file_id}/stats",
            "GET /api/anomalies",
            "GET /api/health",
        ],
    })
}

// =============================================================================
// GET /api/health
// =============================================================================

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state.storage.list_files().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    }))
}

// =============================================================================
// POST /api/logs/upload
// =============================================================================

pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadResponse>, ApiError> {
    let mut field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_input(format!("malformed multipart body: {e}")))?
        .ok_or_else(|| ApiError::bad_input("multipart body has no file field"))?;

    let original_name = field
        .file_name()
        .map(|s| s.to_string())
        .ok_or_else(|| ApiError::bad_input("file field is missing a filename"))?;

    let extension = PathBuf::from(&original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::bad_input(format!("unsupported file extension '{extension}'")));
    }

    let file_id = Uuid::new_v4().to_string();
    let stored_name = format!("{file_id}.{extension}");
    let dest_dir = crate::platform::PlatformPaths::resolve().data_dir.join(UPLOADS_DIR_NAME);
    tokio::fs::create_dir_all(&dest_dir)
        .await
        .map_err(|e| ApiError::storage_unavailable(format!("could not create upload directory: {e}")))?;
    let dest_path = dest_dir.join(&stored_name);

    let mut out = tokio::fs::File::create(&dest_path)
        .await
        .map_err(|e| ApiError::storage_unavailable(format!("could not stage upload: {e}")))?;
    let mut byte_size: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::bad_input(format!("malformed multipart body: {e}")))?
    {
        byte_size += chunk.len() as u64;
        if byte_size > MAX_UPLOAD_BYTES {
            let _ = tokio::fs::remove_file(&dest_path).await;
            return Err(ApiError::bad_input(format!(
                "upload of at least {byte_size} bytes exceeds maximum of {MAX_UPLOAD_BYTES} bytes"
            )));
        }
        out.write_all(&chunk)
            .await
            .map_err(|e| ApiError::storage_unavailable(format!("could not stage upload: {e}")))?;
    }
    out.flush().await.map_err(|e| ApiError::storage_unavailable(e.to_string()))?;

    let file_record = FileUpload {
        file_id: file_id.clone(),
        original_name: original_name.clone(),
        stored_name,
        byte_size,
        uploaded_at: Utc::now(),
        status: FileUploadStatus::Processing,
        processed_logs: 0,
        failed_logs: 0,
        error: None,
    };
    state.storage.insert_file(file_record).await?;

    let source = original_name.clone();
    let (processed, failed) = process_staged_file(&state, &dest_path, &file_id, &source).await;

    let final_status = if failed > 0 && processed == 0 {
        FileUploadStatus::Failed
    } else {
        FileUploadStatus::Completed
    };
    state
        .storage
        .update_file(
            &file_id,
            FileUpdate {
                status: Some(final_status),
                processed_logs_delta: processed,
                failed_logs_delta: failed,
                error: None,
            },
        )
        .await?;

    Ok(Json(UploadResponse {
        file_id,
        filename: original_name,
        processed_logs: processed,
        failed_logs: failed,
        file_size: byte_size,
    }))
}

/// Iterate the staged file line by line through the ingestion pipeline
/// (§4.I). A malformed line increments the failure counter but never
/// aborts the file.
async fn process_staged_file(
    state: &AppState,
    path: &std::path::Path,
    file_id: &str,
    source: &str,
) -> (u64, u64) {
    let file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(_) => return (0, 0),
    };
    let mut lines = BufReader::new(file).lines();
    let mut processed = 0;
    let mut failed = 0;
    let now = Utc::now();

    while let Ok(Some(line)) = lines.next_line().await {
        let result = ingest_line(
            &state.miner,
            &state.storage,
            IngestLine {
                raw_line: line,
                source: source.to_string(),
                file_id: Some(file_id.to_string()),
                ..Default::default()
            },
            now,
        )
        .await;
        match result {
            Ok(_) => processed += 1,
            Err(_) => failed += 1,
        }
    }

    (processed, failed)
}

// =============================================================================
// POST /api/logs/ingest
// =============================================================================

pub async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let severity_override = request.level.as_deref().and_then(Severity::from_label);
    let record = ingest_line(
        &state.miner,
        &state.storage,
        IngestLine {
            raw_line: request.message,
            source: request.source.unwrap_or_else(|| "api".to_string()),
            severity_override,
            event_time_override: request.timestamp,
            metadata: request.metadata,
            ..Default::default()
        },
        Utc::now(),
    )
    .await
    .map_err(|e| ApiError::bad_input(e.to_string()))?;

    Ok(Json(IngestResponse {
        log_id: record.id,
        template_id: record.template_id,
        template: record.template,
    }))
}

// =============================================================================
// POST /api/logs/ingest/fluent-bit
// =============================================================================

pub async fn ingest_fluent_bit(
    State(state): State<AppState>,
    Json(records): Json<Vec<FluentBitRecord>>,
) -> Result<Json<FluentBitResponse>, ApiError> {
    let now = Utc::now();
    let mut processed = 0;
    let mut failed = 0;
    let received = records.len() as u64;

    for record in records {
        let source = record
            .source
            .or(record.tag)
            .unwrap_or_else(|| DEFAULT_FLUENT_BIT_SOURCE.to_string());
        let result = ingest_line(
            &state.miner,
            &state.storage,
            IngestLine {
                raw_line: record.log,
                source,
                event_time_override: record.time,
                ..Default::default()
            },
            now,
        )
        .await;
        match result {
            Ok(_) => processed += 1,
            Err(_) => failed += 1,
        }
    }

    Ok(Json(FluentBitResponse {
        received,
        processed,
        failed,
    }))
}

// =============================================================================
// POST /api/logs/query
// =============================================================================

pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if let Some(limit) = request.limit {
        if limit > MAX_QUERY_LIMIT {
            return Err(ApiError::bad_input(format!("limit {limit} exceeds maximum of {MAX_QUERY_LIMIT}")));
        }
    }

    let filter = request.into_filter();
    let (logs, total_count) = state.storage.find_records(&filter).await?;

    Ok(Json(QueryResponse {
        returned_count: logs.len() as u64,
        logs,
        total_count,
        offset: filter.offset,
        limit: filter.limit,
    }))
}

// =============================================================================
// GET /api/templates
// =============================================================================

pub async fn templates(State(state): State<AppState>) -> Result<Json<TemplateResponse>, ApiError> {
    let mut templates = state.storage.list_templates().await?;
    templates.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(Json(TemplateResponse { templates }))
}

// =============================================================================
// GET /api/stats
// =============================================================================

pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let summary = state.storage.stats_summary(STATS_TOP_N).await?;
    let now = Utc::now();
    let hourly = state
        .storage
        .aggregate_hourly(now - chrono::Duration::hours(DEFAULT_DETECTION_WINDOW_HOURS), now, false, false)
        .await?;

    Ok(Json(StatsResponse {
        total_records: summary.total_records,
        total_templates: summary.total_templates,
        total_files: summary.total_files,
        severity_histogram: summary.severity_histogram,
        top_sources: summary
            .top_sources
            .into_iter()
            .map(|(key, count)| CountEntry { key, count })
            .collect(),
        format_tag_histogram: summary.format_tag_histogram,
        top_files: summary
            .top_files
            .into_iter()
            .map(|(key, count)| CountEntry { key, count })
            .collect(),
        hourly_activity: hourly
            .into_iter()
            .map(|b| HourlyActivity {
                bucket_start: b.bucket_start,
                count: b.count,
            })
            .collect(),
        network_presence_count: summary.network_presence_count,
    }))
}

// =============================================================================
// GET /api/files
// =============================================================================

pub async fn files(State(state): State<AppState>) -> Result<Json<FileListResponse>, ApiError> {
    let files = state.storage.list_files().await?;
    Ok(Json(FileListResponse { files }))
}

// =============================================================================
// GET /api/files/{file_id}/stats
// =============================================================================

pub async fn file_stats(State(state): State<AppState>, Path(file_id): Path<String>) -> Result<Json<FileStatsResponse>, ApiError> {
    if state.storage.get_file(&file_id).await?.is_none() {
        return Err(ApiError::bad_input(format!("unknown file_id '{file_id}'")));
    }
    let summary = state.storage.file_stats_summary(&file_id).await?;

    Ok(Json(FileStatsResponse {
        file_id,
        total_records: summary.total_records,
        severity_histogram: summary.severity_histogram,
        format_tag_histogram: summary.format_tag_histogram,
        network_presence_count: summary.network_presence_count,
        earliest_event_time: summary.earliest_event_time,
        latest_event_time: summary.latest_event_time,
    }))
}

// =============================================================================
// GET /api/anomalies (supplemental convenience; not a named §6 route but a
// thin read over the same storage the daemon writes to)
// =============================================================================

pub async fn anomalies(State(state): State<AppState>) -> Result<Json<AnomalyListResponse>, ApiError> {
    let since = Utc::now() - chrono::Duration::hours(DEFAULT_DETECTION_WINDOW_HOURS);
    let anomalies = state.storage.list_anomalies(since).await?;
    Ok(Json(AnomalyListResponse { anomalies }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::miner_actor;
    use crate::storage::sqlite::SqliteStorage;
    use crate::util::config::AppConfig;
    use std::collections::HashMap;

    async fn test_state() -> AppState {
        let storage = SqliteStorage::connect("sqlite::memory:").await.unwrap();
        let miner = miner_actor::spawn(crate::core::miner::MinerConfig::default());
        let config = AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            storage_url: "sqlite::memory:".to_string(),
            detection_interval_secs: 300,
            debug: false,
            daemon: false,
        };
        AppState::new(miner, std::sync::Arc::new(storage), config)
    }

    #[tokio::test]
    async fn ingest_then_query_round_trips() {
        let state = test_state().await;

        let ingest_response = ingest(
            State(state.clone()),
            Json(IngestRequest {
                timestamp: None,
                level: Some("error".to_string()),
                message: "disk full on /dev/sda1".to_string(),
                source: Some("disk-monitor".to_string()),
                metadata: HashMap::new(),
            }),
        )
        .await
        .unwrap();
        assert!(!ingest_response.log_id.is_empty());

        let query_response = query(
            State(state.clone()),
            Json(QueryRequest {
                template_id: None,
                start_time: None,
                end_time: None,
                level: None,
                source: Some("disk-monitor".to_string()),
                message: None,
                file_id: None,
                format_tag: None,
                has_network_info: None,
                protocol: None,
                ip_address: None,
                limit: None,
                offset: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(query_response.total_count, 1);
        assert_eq!(query_response.logs[0].source, "disk-monitor");
    }

    #[tokio::test]
    async fn query_rejects_limit_above_maximum() {
        let state = test_state().await;
        let result = query(
            State(state),
            Json(QueryRequest {
                template_id: None,
                start_time: None,
                end_time: None,
                level: None,
                source: None,
                message: None,
                file_id: None,
                format_tag: None,
                has_network_info: None,
                protocol: None,
                ip_address: None,
                limit: Some(MAX_QUERY_LIMIT + 1),
                offset: None,
            }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn fluent_bit_falls_back_to_tag_then_default_source() {
        let state = test_state().await;
        let response = ingest_fluent_bit(
            State(state.clone()),
            Json(vec![
                FluentBitRecord {
                    log: "connection reset".to_string(),
                    time: None,
                    tag: Some("nginx.access".to_string()),
                    source: None,
                },
                FluentBitRecord {
                    log: "started worker".to_string(),
                    time: None,
                    tag: None,
                    source: None,
                },
            ]),
        )
        .await
        .unwrap();
        assert_eq!(response.received, 2);
        assert_eq!(response.processed, 2);
        assert_eq!(response.failed, 0);

        let (records, _) = state
            .storage
            .find_records(&crate::core::filter::QueryFilter::default())
            .await
            .unwrap();
        let sources: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
        assert!(sources.contains(&"nginx.access"));
        assert!(sources.contains(&DEFAULT_FLUENT_BIT_SOURCE));
    }

    #[tokio::test]
    async fn file_stats_rejects_unknown_file_id() {
        let state = test_state().await;
        let result = file_stats(State(state), Path("does-not-exist".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stats_reports_seeded_totals() {
        let state = test_state().await;
        ingest(
            State(state.clone()),
            Json(IngestRequest {
                timestamp: None,
                level: None,
                message: "hello world".to_string(),
                source: Some("test".to_string()),
                metadata: HashMap::new(),
            }),
        )
        .await
        .unwrap();

        let response = stats(State(state)).await.unwrap();
        assert_eq!(response.total_records, 1);
        assert_eq!(response.total_templates, 1);
    }
}

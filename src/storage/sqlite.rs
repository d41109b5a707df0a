// LogSleuth - storage/sqlite.rs
//
// SQLite-backed `StorageAdapter` (§4.F, §9 storage backend decision).
//
// Flexible/variable-shape fields (`NetworkInfo`, `parsed_fields`,
// `metadata`, `affected_templates`, `details`) are stored as JSON text
// columns rather than normalised into further tables, mirroring how a
// document store would hold them while keeping the file scannable with
// plain SQL for the fields that need indices and range queries.

use crate::core::filter::QueryFilter;
use crate::core::model::{
    Anomaly, AnomalyKind, AnomalySeverity, FileUpload, FileUploadStatus, LogRecord, NetworkInfo, Severity,
    Template,
};
use crate::storage::adapter::{FileStatsSummary, FileUpdate, HourlyBucket, StatsSummary, StorageAdapter};
use crate::util::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Connect to `url` (e.g. `sqlite:///var/lib/logsleuth/logsleuth.sqlite3`)
    /// and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(url)
            .await
            .map_err(|source| StorageError::Connection {
                url: url.to_string(),
                source,
            })?;
        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS logs (
                id TEXT PRIMARY KEY,
                ingested_at TEXT NOT NULL,
                event_time TEXT NOT NULL,
                severity TEXT NOT NULL,
                message TEXT NOT NULL,
                source TEXT NOT NULL,
                format_tag TEXT NOT NULL,
                template_id TEXT NOT NULL,
                template TEXT NOT NULL,
                cluster_size INTEGER NOT NULL,
                network TEXT NOT NULL,
                parsed_fields TEXT NOT NULL,
                metadata TEXT NOT NULL,
                file_id TEXT,
                event_time_clamped_from TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(event_time DESC);
            CREATE INDEX IF NOT EXISTS idx_logs_template_id ON logs(template_id);
            CREATE INDEX IF NOT EXISTS idx_logs_file_id ON logs(file_id);
            CREATE INDEX IF NOT EXISTS idx_logs_severity ON logs(severity);
            CREATE INDEX IF NOT EXISTS idx_logs_source ON logs(source);

            CREATE TABLE IF NOT EXISTS templates (
                template_id TEXT PRIMARY KEY,
                template_string TEXT NOT NULL,
                first_seen TEXT NOT NULL,
                last_seen TEXT NOT NULL,
                count INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS files (
                file_id TEXT PRIMARY KEY,
                original_name TEXT NOT NULL,
                stored_name TEXT NOT NULL,
                byte_size INTEGER NOT NULL,
                uploaded_at TEXT NOT NULL,
                status TEXT NOT NULL,
                processed_logs INTEGER NOT NULL,
                failed_logs INTEGER NOT NULL,
                error TEXT
            );

            CREATE TABLE IF NOT EXISTS anomalies (
                id TEXT PRIMARY KEY,
                event_time TEXT NOT NULL,
                kind TEXT NOT NULL,
                severity TEXT NOT NULL,
                description TEXT NOT NULL,
                affected_templates TEXT NOT NULL,
                log_count INTEGER NOT NULL,
                score REAL NOT NULL,
                details TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_anomalies_timestamp ON anomalies(event_time DESC);
            CREATE INDEX IF NOT EXISTS idx_anomalies_severity ON anomalies(severity);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|source| StorageError::Migration { source })?;
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<LogRecord, StorageError> {
        let network: NetworkInfo = serde_json::from_str(row.try_get::<String, _>("network").unwrap_or_default().as_str())
            .map_err(|source| StorageError::Encoding {
                operation: "decode logs.network",
                source,
            })?;
        let parsed_fields: HashMap<String, String> =
            serde_json::from_str(row.try_get::<String, _>("parsed_fields").unwrap_or_default().as_str())
                .map_err(|source| StorageError::Encoding {
                    operation: "decode logs.parsed_fields",
                    source,
                })?;
        let metadata: HashMap<String, String> =
            serde_json::from_str(row.try_get::<String, _>("metadata").unwrap_or_default().as_str())
                .map_err(|source| StorageError::Encoding {
                    operation: "decode logs.metadata",
                    source,
                })?;

        Ok(LogRecord {
            id: row.try_get("id").unwrap_or_default(),
            ingested_at: parse_ts(&row.try_get::<String, _>("ingested_at").unwrap_or_default()),
            event_time: parse_ts(&row.try_get::<String, _>("event_time").unwrap_or_default()),
            severity: Severity::from_label(&row.try_get::<String, _>("severity").unwrap_or_default())
                .unwrap_or_default(),
            message: row.try_get("message").unwrap_or_default(),
            source: row.try_get("source").unwrap_or_default(),
            format_tag: row.try_get("format_tag").unwrap_or_default(),
            template_id: row.try_get("template_id").unwrap_or_default(),
            template: row.try_get("template").unwrap_or_default(),
            cluster_size: row.try_get::<i64, _>("cluster_size").unwrap_or_default() as u64,
            network,
            parsed_fields,
            metadata,
            file_id: row.try_get("file_id").ok(),
            event_time_clamped_from: row
                .try_get::<Option<String>, _>("event_time_clamped_from")
                .ok()
                .flatten()
                .map(|s| parse_ts(&s)),
        })
    }
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn insert_record(&self, mut record: LogRecord) -> Result<LogRecord, StorageError> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let network = serde_json::to_string(&record.network).map_err(|source| StorageError::Encoding {
            operation: "encode logs.network",
            source,
        })?;
        let parsed_fields =
            serde_json::to_string(&record.parsed_fields).map_err(|source| StorageError::Encoding {
                operation: "encode logs.parsed_fields",
                source,
            })?;
        let metadata = serde_json::to_string(&record.metadata).map_err(|source| StorageError::Encoding {
            operation: "encode logs.metadata",
            source,
        })?;

        sqlx::query(
            r#"
            INSERT INTO logs (
                id, ingested_at, event_time, severity, message, source, format_tag,
                template_id, template, cluster_size, network, parsed_fields, metadata,
                file_id, event_time_clamped_from
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.ingested_at.to_rfc3339())
        .bind(record.event_time.to_rfc3339())
        .bind(record.severity.label())
        .bind(&record.message)
        .bind(&record.source)
        .bind(&record.format_tag)
        .bind(&record.template_id)
        .bind(&record.template)
        .bind(record.cluster_size as i64)
        .bind(network)
        .bind(parsed_fields)
        .bind(metadata)
        .bind(&record.file_id)
        .bind(record.event_time_clamped_from.map(|ts| ts.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|source| StorageError::Query {
            operation: "insert_record",
            source,
        })?;

        Ok(record)
    }

    async fn upsert_template(
        &self,
        template_id: &str,
        template_string: &str,
        event_time: DateTime<Utc>,
    ) -> Result<Template, StorageError> {
        sqlx::query(
            r#"
            INSERT INTO templates (template_id, template_string, first_seen, last_seen, count)
            VALUES (?, ?, ?, ?, 1)
            ON CONFLICT(template_id) DO UPDATE SET
                last_seen = excluded.last_seen,
                count = count + 1
            "#,
        )
        .bind(template_id)
        .bind(template_string)
        .bind(event_time.to_rfc3339())
        .bind(event_time.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|source| StorageError::Query {
            operation: "upsert_template",
            source,
        })?;

        let row = sqlx::query("SELECT template_id, template_string, first_seen, last_seen, count FROM templates WHERE template_id = ?")
            .bind(template_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "upsert_template_fetch",
                source,
            })?;

        Ok(Template {
            template_id: row.try_get("template_id").unwrap_or_default(),
            template_string: row.try_get("template_string").unwrap_or_default(),
            first_seen: parse_ts(&row.try_get::<String, _>("first_seen").unwrap_or_default()),
            last_seen: parse_ts(&row.try_get::<String, _>("last_seen").unwrap_or_default()),
            count: row.try_get::<i64, _>("count").unwrap_or_default() as u64,
        })
    }

    async fn list_templates(&self) -> Result<Vec<Template>, StorageError> {
        let rows = sqlx::query("SELECT template_id, template_string, first_seen, last_seen, count FROM templates")
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "list_templates",
                source,
            })?;
        Ok(rows
            .iter()
            .map(|row| Template {
                template_id: row.try_get("template_id").unwrap_or_default(),
                template_string: row.try_get("template_string").unwrap_or_default(),
                first_seen: parse_ts(&row.try_get::<String, _>("first_seen").unwrap_or_default()),
                last_seen: parse_ts(&row.try_get::<String, _>("last_seen").unwrap_or_default()),
                count: row.try_get::<i64, _>("count").unwrap_or_default() as u64,
            })
            .collect())
    }

    async fn insert_file(&self, file: FileUpload) -> Result<FileUpload, StorageError> {
        sqlx::query(
            r#"
            INSERT INTO files (file_id, original_name, stored_name, byte_size, uploaded_at, status, processed_logs, failed_logs, error)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.file_id)
        .bind(&file.original_name)
        .bind(&file.stored_name)
        .bind(file.byte_size as i64)
        .bind(file.uploaded_at.to_rfc3339())
        .bind(status_label(file.status))
        .bind(file.processed_logs as i64)
        .bind(file.failed_logs as i64)
        .bind(&file.error)
        .execute(&self.pool)
        .await
        .map_err(|source| StorageError::Query {
            operation: "insert_file",
            source,
        })?;
        Ok(file)
    }

    async fn update_file(&self, file_id: &str, update: FileUpdate) -> Result<(), StorageError> {
        if let Some(status) = update.status {
            sqlx::query("UPDATE files SET status = ? WHERE file_id = ?")
                .bind(status_label(status))
                .bind(file_id)
                .execute(&self.pool)
                .await
                .map_err(|source| StorageError::Query {
                    operation: "update_file_status",
                    source,
                })?;
        }
        if update.processed_logs_delta > 0 || update.failed_logs_delta > 0 {
            sqlx::query(
                "UPDATE files SET processed_logs = processed_logs + ?, failed_logs = failed_logs + ? WHERE file_id = ?",
            )
            .bind(update.processed_logs_delta as i64)
            .bind(update.failed_logs_delta as i64)
            .bind(file_id)
            .execute(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "update_file_counters",
                source,
            })?;
        }
        if let Some(error) = update.error {
            sqlx::query("UPDATE files SET error = ? WHERE file_id = ?")
                .bind(error)
                .bind(file_id)
                .execute(&self.pool)
                .await
                .map_err(|source| StorageError::Query {
                    operation: "update_file_error",
                    source,
                })?;
        }
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<Option<FileUpload>, StorageError> {
        let row = sqlx::query(
            "SELECT file_id, original_name, stored_name, byte_size, uploaded_at, status, processed_logs, failed_logs, error FROM files WHERE file_id = ?",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|source| StorageError::Query {
            operation: "get_file",
            source,
        })?;
        Ok(row.map(|r| row_to_file(&r)))
    }

    async fn list_files(&self) -> Result<Vec<FileUpload>, StorageError> {
        let rows = sqlx::query(
            "SELECT file_id, original_name, stored_name, byte_size, uploaded_at, status, processed_logs, failed_logs, error FROM files ORDER BY uploaded_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|source| StorageError::Query {
            operation: "list_files",
            source,
        })?;
        Ok(rows.iter().map(row_to_file).collect())
    }

    async fn find_records(&self, filter: &QueryFilter) -> Result<(Vec<LogRecord>, u64), StorageError> {
        let mut where_clauses: Vec<String> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(ref id) = filter.template_id {
            where_clauses.push("template_id = ?".to_string());
            binds.push(id.clone());
        }
        if let Some(start) = filter.start_time {
            where_clauses.push("event_time >= ?".to_string());
            binds.push(start.to_rfc3339());
        }
        if let Some(end) = filter.end_time {
            where_clauses.push("event_time <= ?".to_string());
            binds.push(end.to_rfc3339());
        }
        if let Some(level) = filter.level {
            where_clauses.push("severity = ?".to_string());
            binds.push(level.label().to_string());
        }
        if let Some(ref needle) = filter.source {
            where_clauses.push("source LIKE ?".to_string());
            binds.push(format!("%{needle}%"));
        }
        if let Some(ref needle) = filter.message {
            where_clauses.push("message LIKE ?".to_string());
            binds.push(format!("%{needle}%"));
        }
        if let Some(ref id) = filter.file_id {
            where_clauses.push("file_id = ?".to_string());
            binds.push(id.clone());
        }
        if let Some(ref tag) = filter.format_tag {
            where_clauses.push("format_tag = ?".to_string());
            binds.push(tag.clone());
        }
        if filter.has_network_info == Some(true) {
            where_clauses.push("network != '{}'".to_string());
        }
        if let Some(ref proto) = filter.protocol {
            where_clauses.push("network LIKE ?".to_string());
            binds.push(format!("%{proto}%"));
        }
        if let Some(ref ip) = filter.ip_address {
            where_clauses.push("network LIKE ?".to_string());
            binds.push(format!("%{ip}%"));
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) as total FROM logs {where_sql}");
        let mut count_query = sqlx::query(&count_sql);
        for bind in &binds {
            count_query = count_query.bind(bind);
        }
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "find_records_count",
                source,
            })?
            .try_get("total")
            .unwrap_or_default();

        let page_sql = format!(
            "SELECT * FROM logs {where_sql} ORDER BY event_time DESC LIMIT ? OFFSET ?"
        );
        let mut page_query = sqlx::query(&page_sql);
        for bind in &binds {
            page_query = page_query.bind(bind);
        }
        page_query = page_query.bind(filter.limit as i64).bind(filter.offset as i64);

        let rows = page_query.fetch_all(&self.pool).await.map_err(|source| StorageError::Query {
            operation: "find_records_page",
            source,
        })?;

        let records = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((records, total as u64))
    }

    async fn aggregate_hourly(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        group_by_source: bool,
        group_by_template: bool,
    ) -> Result<Vec<HourlyBucket>, StorageError> {
        let group_col = if group_by_source {
            "source"
        } else if group_by_template {
            "template_id"
        } else {
            "NULL"
        };

        let sql = format!(
            r#"
            SELECT
                strftime('%Y-%m-%dT%H:00:00Z', event_time) AS bucket_start,
                {group_col} AS grouping_key,
                COUNT(*) AS count,
                SUM(CASE WHEN severity IN ('CRITICAL', 'ERROR', 'WARN') THEN 1 ELSE 0 END) AS error_count,
                COUNT(DISTINCT template_id) AS unique_templates,
                COUNT(DISTINCT source) AS unique_sources
            FROM logs
            WHERE event_time >= ? AND event_time < ?
            GROUP BY bucket_start, grouping_key
            ORDER BY bucket_start ASC
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(start.to_rfc3339())
            .bind(end.to_rfc3339())
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "aggregate_hourly",
                source,
            })?;

        Ok(rows
            .iter()
            .map(|row| {
                let grouping_key: Option<String> = row.try_get("grouping_key").ok();
                HourlyBucket {
                    bucket_start: parse_ts(&row.try_get::<String, _>("bucket_start").unwrap_or_default()),
                    count: row.try_get::<i64, _>("count").unwrap_or_default() as u64,
                    error_count: row.try_get::<i64, _>("error_count").unwrap_or_default() as u64,
                    unique_templates: row.try_get::<i64, _>("unique_templates").unwrap_or_default() as u64,
                    unique_sources: row.try_get::<i64, _>("unique_sources").unwrap_or_default() as u64,
                    source: if group_by_source { grouping_key.clone() } else { None },
                    template_id: if group_by_template { grouping_key } else { None },
                }
            })
            .collect())
    }

    async fn insert_anomaly(&self, mut anomaly: Anomaly) -> Result<Anomaly, StorageError> {
        let id = anomaly.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        anomaly.id = Some(id.clone());

        let affected = serde_json::to_string(&anomaly.affected_templates).map_err(|source| StorageError::Encoding {
            operation: "encode anomalies.affected_templates",
            source,
        })?;
        let details = serde_json::to_string(&anomaly.details).map_err(|source| StorageError::Encoding {
            operation: "encode anomalies.details",
            source,
        })?;

        sqlx::query(
            r#"
            INSERT INTO anomalies (id, event_time, kind, severity, description, affected_templates, log_count, score, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(anomaly.event_time.to_rfc3339())
        .bind(kind_label(anomaly.kind))
        .bind(severity_label(anomaly.severity))
        .bind(&anomaly.description)
        .bind(affected)
        .bind(anomaly.log_count as i64)
        .bind(anomaly.score)
        .bind(details)
        .bind(anomaly.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|source| StorageError::Query {
            operation: "insert_anomaly",
            source,
        })?;

        Ok(anomaly)
    }

    async fn list_anomalies(&self, since: DateTime<Utc>) -> Result<Vec<Anomaly>, StorageError> {
        let rows = sqlx::query("SELECT * FROM anomalies WHERE event_time >= ? ORDER BY event_time DESC")
            .bind(since.to_rfc3339())
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "list_anomalies",
                source,
            })?;

        rows.iter()
            .map(|row| {
                let affected_templates: Vec<String> =
                    serde_json::from_str(&row.try_get::<String, _>("affected_templates").unwrap_or_default())
                        .map_err(|source| StorageError::Encoding {
                            operation: "decode anomalies.affected_templates",
                            source,
                        })?;
                let details: HashMap<String, serde_json::Value> =
                    serde_json::from_str(&row.try_get::<String, _>("details").unwrap_or_default()).map_err(|source| {
                        StorageError::Encoding {
                            operation: "decode anomalies.details",
                            source,
                        }
                    })?;
                Ok(Anomaly {
                    id: row.try_get("id").ok(),
                    event_time: parse_ts(&row.try_get::<String, _>("event_time").unwrap_or_default()),
                    kind: kind_from_label(&row.try_get::<String, _>("kind").unwrap_or_default()),
                    severity: severity_from_label(&row.try_get::<String, _>("severity").unwrap_or_default()),
                    description: row.try_get("description").unwrap_or_default(),
                    affected_templates,
                    log_count: row.try_get::<i64, _>("log_count").unwrap_or_default() as u64,
                    score: row.try_get("score").unwrap_or_default(),
                    details,
                    created_at: parse_ts(&row.try_get::<String, _>("created_at").unwrap_or_default()),
                })
            })
            .collect()
    }

    async fn count_records_for_template(&self, template_id: &str, since: DateTime<Utc>) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as total FROM logs WHERE template_id = ? AND event_time >= ?")
            .bind(template_id)
            .bind(since.to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "count_records_for_template",
                source,
            })?;
        Ok(row.try_get::<i64, _>("total").unwrap_or_default() as u64)
    }

    async fn stats_summary(&self, top_n: usize) -> Result<StatsSummary, StorageError> {
        let total_records: i64 = sqlx::query("SELECT COUNT(*) as total FROM logs")
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "stats_total_records",
                source,
            })?
            .try_get("total")
            .unwrap_or_default();

        let total_templates: i64 = sqlx::query("SELECT COUNT(*) as total FROM templates")
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "stats_total_templates",
                source,
            })?
            .try_get("total")
            .unwrap_or_default();

        let total_files: i64 = sqlx::query("SELECT COUNT(*) as total FROM files")
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "stats_total_files",
                source,
            })?
            .try_get("total")
            .unwrap_or_default();

        let severity_histogram = fetch_count_histogram(&self.pool, "SELECT severity AS key, COUNT(*) AS n FROM logs GROUP BY severity").await?;
        let format_tag_histogram = fetch_count_histogram(&self.pool, "SELECT format_tag AS key, COUNT(*) AS n FROM logs GROUP BY format_tag").await?;

        let top_sources = fetch_top_n(
            &self.pool,
            "SELECT source AS key, COUNT(*) AS n FROM logs GROUP BY source ORDER BY n DESC LIMIT ?",
            top_n,
        )
        .await?;
        let top_files = fetch_top_n(
            &self.pool,
            "SELECT file_id AS key, COUNT(*) AS n FROM logs WHERE file_id IS NOT NULL GROUP BY file_id ORDER BY n DESC LIMIT ?",
            top_n,
        )
        .await?;

        let network_presence_count: i64 = sqlx::query("SELECT COUNT(*) as total FROM logs WHERE network != '{}'")
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "stats_network_presence",
                source,
            })?
            .try_get("total")
            .unwrap_or_default();

        Ok(StatsSummary {
            total_records: total_records as u64,
            total_templates: total_templates as u64,
            total_files: total_files as u64,
            severity_histogram,
            top_sources,
            format_tag_histogram,
            top_files,
            network_presence_count: network_presence_count as u64,
        })
    }

    async fn file_stats_summary(&self, file_id: &str) -> Result<FileStatsSummary, StorageError> {
        let total_records: i64 = sqlx::query("SELECT COUNT(*) as total FROM logs WHERE file_id = ?")
            .bind(file_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "file_stats_total_records",
                source,
            })?
            .try_get("total")
            .unwrap_or_default();

        let severity_histogram = fetch_count_histogram_for_file(
            &self.pool,
            "SELECT severity AS key, COUNT(*) AS n FROM logs WHERE file_id = ? GROUP BY severity",
            file_id,
        )
        .await?;
        let format_tag_histogram = fetch_count_histogram_for_file(
            &self.pool,
            "SELECT format_tag AS key, COUNT(*) AS n FROM logs WHERE file_id = ? GROUP BY format_tag",
            file_id,
        )
        .await?;

        let network_presence_count: i64 =
            sqlx::query("SELECT COUNT(*) as total FROM logs WHERE file_id = ? AND network != '{}'")
                .bind(file_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|source| StorageError::Query {
                    operation: "file_stats_network_presence",
                    source,
                })?
                .try_get("total")
                .unwrap_or_default();

        let range_row = sqlx::query("SELECT MIN(event_time) AS earliest, MAX(event_time) AS latest FROM logs WHERE file_id = ?")
            .bind(file_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StorageError::Query {
                operation: "file_stats_range",
                source,
            })?;
        let earliest_event_time = range_row
            .try_get::<Option<String>, _>("earliest")
            .ok()
            .flatten()
            .map(|s| parse_ts(&s));
        let latest_event_time = range_row
            .try_get::<Option<String>, _>("latest")
            .ok()
            .flatten()
            .map(|s| parse_ts(&s));

        Ok(FileStatsSummary {
            total_records: total_records as u64,
            severity_histogram,
            format_tag_histogram,
            network_presence_count: network_presence_count as u64,
            earliest_event_time,
            latest_event_time,
        })
    }
}

async fn fetch_count_histogram(pool: &SqlitePool, sql: &str) -> Result<HashMap<String, u64>, StorageError> {
    let rows = sqlx::query(sql).fetch_all(pool).await.map_err(|source| StorageError::Query {
        operation: "fetch_count_histogram",
        source,
    })?;
    Ok(rows
        .iter()
        .map(|row| {
            (
                row.try_get::<String, _>("key").unwrap_or_default(),
                row.try_get::<i64, _>("n").unwrap_or_default() as u64,
            )
        })
        .collect())
}

async fn fetch_count_histogram_for_file(pool: &SqlitePool, sql: &str, file_id: &str) -> Result<HashMap<String, u64>, StorageError> {
    let rows = sqlx::query(sql)
        .bind(file_id)
        .fetch_all(pool)
        .await
        .map_err(|source| StorageError::Query {
            operation: "fetch_count_histogram_for_file",
            source,
        })?;
    Ok(rows
        .iter()
        .map(|row| {
            (
                row.try_get::<String, _>("key").unwrap_or_default(),
                row.try_get::<i64, _>("n").unwrap_or_default() as u64,
            )
        })
        .collect())
}

async fn fetch_top_n(pool: &SqlitePool, sql: &str, top_n: usize) -> Result<Vec<(String, u64)>, StorageError> {
    let rows = sqlx::query(sql)
        .bind(top_n as i64)
        .fetch_all(pool)
        .await
        .map_err(|source| StorageError::Query {
            operation: "fetch_top_n",
            source,
        })?;
    Ok(rows
        .iter()
        .map(|row| {
            (
                row.try_get::<String, _>("key").unwrap_or_default(),
                row.try_get::<i64, _>("n").unwrap_or_default() as u64,
            )
        })
        .collect())
}

fn row_to_file(row: &sqlx::sqlite::SqliteRow) -> FileUpload {
    FileUpload {
        file_id: row.try_get("file_id").unwrap_or_default(),
        original_name: row.try_get("original_name").unwrap_or_default(),
        stored_name: row.try_get("stored_name").unwrap_or_default(),
        byte_size: row.try_get::<i64, _>("byte_size").unwrap_or_default() as u64,
        uploaded_at: parse_ts(&row.try_get::<String, _>("uploaded_at").unwrap_or_default()),
        status: status_from_label(&row.try_get::<String, _>("status").unwrap_or_default()),
        processed_logs: row.try_get::<i64, _>("processed_logs").unwrap_or_default() as u64,
        failed_logs: row.try_get::<i64, _>("failed_logs").unwrap_or_default() as u64,
        error: row.try_get("error").ok(),
    }
}

fn status_label(status: FileUploadStatus) -> &'static str {
    match status {
        FileUploadStatus::Processing => "processing",
        FileUploadStatus::Completed => "completed",
        FileUploadStatus::Failed => "failed",
    }
}

fn status_from_label(label: &str) -> FileUploadStatus {
    match label {
        "completed" => FileUploadStatus::Completed,
        "failed" => FileUploadStatus::Failed,
        _ => FileUploadStatus::Processing,
    }
}

fn kind_label(kind: AnomalyKind) -> &'static str {
    match kind {
        AnomalyKind::VolumeSpike => "VOLUME_SPIKE",
        AnomalyKind::VolumeDrop => "VOLUME_DROP",
        AnomalyKind::HighErrorRate => "HIGH_ERROR_RATE",
        AnomalyKind::NewTemplateSurge => "NEW_TEMPLATE_SURGE",
        AnomalyKind::RareTemplateActivity => "RARE_TEMPLATE_ACTIVITY",
        AnomalyKind::MlDetectedAnomaly => "ML_DETECTED_ANOMALY",
        AnomalyKind::SourceSilence => "SOURCE_SILENCE",
    }
}

fn kind_from_label(label: &str) -> AnomalyKind {
    match label {
        "VOLUME_SPIKE" => AnomalyKind::VolumeSpike,
        "VOLUME_DROP" => AnomalyKind::VolumeDrop,
        "HIGH_ERROR_RATE" => AnomalyKind::HighErrorRate,
        "NEW_TEMPLATE_SURGE" => AnomalyKind::NewTemplateSurge,
        "RARE_TEMPLATE_ACTIVITY" => AnomalyKind::RareTemplateActivity,
        "ML_DETECTED_ANOMALY" => AnomalyKind::MlDetectedAnomaly,
        _ => AnomalyKind::SourceSilence,
    }
}

fn severity_label(severity: AnomalySeverity) -> &'static str {
    match severity {
        AnomalySeverity::Low => "LOW",
        AnomalySeverity::Medium => "MEDIUM",
        AnomalySeverity::High => "HIGH",
        AnomalySeverity::Critical => "CRITICAL",
    }
}

fn severity_from_label(label: &str) -> AnomalySeverity {
    match label {
        "LOW" => AnomalySeverity::Low,
        "HIGH" => AnomalySeverity::High,
        "CRITICAL" => AnomalySeverity::Critical,
        _ => AnomalySeverity::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ingest::{ingest_line, IngestLine};
    use crate::core::miner::MinerConfig;
    use crate::core::miner_actor;
    use std::sync::Arc;

    async fn seed(storage: &Arc<dyn StorageAdapter>, lines: &[(&str, &str)]) {
        let miner = miner_actor::spawn(MinerConfig::default());
        for (raw_line, source) in lines {
            ingest_line(
                &miner,
                storage,
                IngestLine {
                    raw_line: raw_line.to_string(),
                    source: source.to_string(),
                    ..Default::default()
                },
                Utc::now(),
            )
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn stats_summary_counts_records_and_sources() {
        let storage: Arc<dyn StorageAdapter> = Arc::new(SqliteStorage::connect("sqlite::memory:").await.unwrap());
        seed(
            &storage,
            &[
                ("User 1 logged in", "auth"),
                ("User 2 logged in", "auth"),
                ("Disk usage at 90%", "monitor"),
            ],
        )
        .await;

        let summary = storage.stats_summary(10).await.unwrap();
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.total_templates, 2);
        let auth_count = summary.top_sources.iter().find(|(key, _)| key == "auth").map(|(_, n)| *n);
        assert_eq!(auth_count, Some(2));
    }

    #[tokio::test]
    async fn file_stats_summary_scopes_to_one_file() {
        let storage: Arc<dyn StorageAdapter> = Arc::new(SqliteStorage::connect("sqlite::memory:").await.unwrap());
        let miner = miner_actor::spawn(MinerConfig::default());

        ingest_line(
            &miner,
            &storage,
            IngestLine {
                raw_line: "User 1 logged in".to_string(),
                source: "auth".to_string(),
                file_id: Some("file-a".to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();
        ingest_line(
            &miner,
            &storage,
            IngestLine {
                raw_line: "User 2 logged in".to_string(),
                source: "auth".to_string(),
                file_id: Some("file-b".to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();

        let summary = storage.file_stats_summary("file-a").await.unwrap();
        assert_eq!(summary.total_records, 1);
        assert!(summary.earliest_event_time.is_some());
    }

    #[tokio::test]
    async fn find_records_filters_by_source() {
        let storage: Arc<dyn StorageAdapter> = Arc::new(SqliteStorage::connect("sqlite::memory:").await.unwrap());
        seed(
            &storage,
            &[("User 1 logged in", "auth"), ("Disk usage at 90%", "monitor")],
        )
        .await;

        let filter = QueryFilter {
            source: Some("auth".to_string()),
            ..Default::default()
        };
        let (records, total) = storage.find_records(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "auth");
    }
}

// LogSleuth - app/ingest.rs
//
// Ingestion pipeline (§4.I): drives one raw line through classify → mine →
// assemble → persist. Shared by the upload handler (one call per file line)
// and the single/Fluent-Bit ingest handlers, so the HTTP layer stays thin
// marshalling code.

use crate::core::assembler::{self, AssemblyInput};
use crate::core::classifier;
use crate::core::miner_actor::{self, MinerHandle};
use crate::core::model::{LogRecord, Severity};
use crate::storage::StorageAdapter;
use crate::util::error::IngestError;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// One raw line plus the overrides a structured ingest request may supply
/// on top of whatever the classifier/miner infer.
#[derive(Default)]
pub struct IngestLine {
    pub raw_line: String,
    pub source: String,
    pub file_id: Option<String>,
    pub severity_override: Option<Severity>,
    pub event_time_override: Option<DateTime<Utc>>,
    /// Caller-supplied metadata, merged into the assembled record's
    /// `metadata` map without overwriting keys already populated from
    /// structured captures.
    pub metadata: std::collections::HashMap<String, String>,
}

/// Run one line through the pipeline and persist the result. Returns
/// `Err(MalformedRequest)` for an empty line (§8: "Empty line → rejected,
/// not persisted") without touching the miner or storage.
pub async fn ingest_line(
    miner: &MinerHandle,
    storage: &Arc<dyn StorageAdapter>,
    line: IngestLine,
    ingested_at: DateTime<Utc>,
) -> Result<LogRecord, IngestError> {
    let trimmed = line.raw_line.trim();
    if trimmed.is_empty() {
        return Err(IngestError::MalformedRequest {
            reason: "empty line".to_string(),
        });
    }

    let classification = classifier::classify(trimmed);
    let outcome = mine(miner.clone(), trimmed.to_string()).await;

    let mut record = assembler::assemble(
        AssemblyInput {
            raw_line: trimmed,
            source: line.source,
            file_id: line.file_id,
            ingested_at,
        },
        &classification,
        outcome,
    );
    assembler::apply_overrides(&mut record, line.severity_override, line.event_time_override);
    for (key, value) in line.metadata {
        record.metadata.entry(key).or_insert(value);
    }

    storage
        .upsert_template(&record.template_id, &record.template, record.event_time)
        .await?;
    let record = storage.insert_record(record).await?;
    Ok(record)
}

/// Submit one line to the single-writer miner actor off the async executor's
/// worker threads (§5 "the miner itself never suspends"). A panicked
/// blocking task (rather than the miner thread itself, which already
/// recovers internally) falls back to the same deterministic pseudo-template.
async fn mine(miner: MinerHandle, message: String) -> miner_actor::ActorOutcome {
    let fallback_message = message.clone();
    tokio::task::spawn_blocking(move || miner.add_log_message(&message))
        .await
        .unwrap_or_else(|_| miner_actor::fallback_outcome(&fallback_message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::miner::MinerConfig;
    use crate::storage::sqlite::SqliteStorage;

    async fn test_storage() -> Arc<dyn StorageAdapter> {
        Arc::new(SqliteStorage::connect("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn ingest_line_rejects_empty_input() {
        let miner = miner_actor::spawn(MinerConfig::default());
        let storage = test_storage().await;
        let result = ingest_line(
            &miner,
            &storage,
            IngestLine {
                raw_line: "   ".to_string(),
                source: "test".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(IngestError::MalformedRequest { .. })));
    }

    #[tokio::test]
    async fn ingest_line_persists_and_upserts_template() {
        let miner = miner_actor::spawn(MinerConfig::default());
        let storage = test_storage().await;
        let record = ingest_line(
            &miner,
            &storage,
            IngestLine {
                raw_line: "User 42 logged in".to_string(),
                source: "test".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(!record.id.is_empty());

        let templates = storage.list_templates().await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].count, 1);
    }
}

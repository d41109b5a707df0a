// LogSleuth - tests/e2e_service.rs
//
// End-to-end tests for the ingestion and anomaly-detection pipeline, run
// against a real in-memory SQLite database and the real miner actor — no
// mocks. Exercises the full path from a raw line through classification,
// template mining, persistence, and statistics aggregation.

use chrono::{Duration, Utc};
use logsleuth::anomaly::run_detection_cycle;
use logsleuth::app::ingest::{ingest_line, IngestLine};
use logsleuth::core::filter::QueryFilter;
use logsleuth::core::miner::MinerConfig;
use logsleuth::core::miner_actor;
use logsleuth::storage::sqlite::SqliteStorage;
use logsleuth::storage::StorageAdapter;
use std::sync::Arc;

async fn in_memory_storage() -> Arc<dyn StorageAdapter> {
    Arc::new(SqliteStorage::connect("sqlite::memory:").await.unwrap())
}

#[tokio::test]
async fn repeated_lines_cluster_into_one_template() {
    let storage = in_memory_storage().await;
    let miner = miner_actor::spawn(MinerConfig::default());

    for user_id in 1..=5 {
        ingest_line(
            &miner,
            &storage,
            IngestLine {
                raw_line: format!("User {user_id} logged in from 10.0.0.{user_id}"),
                source: "auth".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();
    }

    let templates = storage.list_templates().await.unwrap();
    assert_eq!(templates.len(), 1, "numeric user ids and ips should mine to one template");
    assert_eq!(templates[0].count, 5);

    let summary = storage.stats_summary(10).await.unwrap();
    assert_eq!(summary.total_records, 5);
    assert_eq!(summary.total_templates, 1);
}

#[tokio::test]
async fn query_filters_by_source_and_respects_limit() {
    let storage = in_memory_storage().await;
    let miner = miner_actor::spawn(MinerConfig::default());

    ingest_line(
        &miner,
        &storage,
        IngestLine {
            raw_line: "Backup completed successfully".to_string(),
            source: "backup".to_string(),
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
            raw_line: "Disk usage at 95%".to_string(),
            source: "monitor".to_string(),
            ..Default::default()
        },
        Utc::now(),
    )
    .await
    .unwrap();

    let filter = QueryFilter {
        source: Some("backup".to_string()),
        limit: 10,
        ..Default::default()
    };
    let (records, total) = storage.find_records(&filter).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(records[0].source, "backup");
}

#[tokio::test]
async fn empty_line_is_rejected_without_touching_storage() {
    let storage = in_memory_storage().await;
    let miner = miner_actor::spawn(MinerConfig::default());

    let result = ingest_line(
        &miner,
        &storage,
        IngestLine {
            raw_line: "   \n".to_string(),
            source: "test".to_string(),
            ..Default::default()
        },
        Utc::now(),
    )
    .await;
    assert!(result.is_err());

    let summary = storage.stats_summary(10).await.unwrap();
    assert_eq!(summary.total_records, 0);
}

#[tokio::test]
async fn detection_cycle_flags_a_volume_spike() {
    let storage = in_memory_storage().await;
    let miner = miner_actor::spawn(MinerConfig::default());
    let now = Utc::now();

    // A quiet history, then a burst of distinct templates in the final hour
    // so the volume strategy's rolling z-score trips.
    for hour_offset in (1..24).rev() {
        let event_time = now - Duration::hours(hour_offset);
        ingest_line(
            &miner,
            &storage,
            IngestLine {
                raw_line: "heartbeat ok".to_string(),
                source: "heartbeat".to_string(),
                event_time_override: Some(event_time),
                ..Default::default()
            },
            event_time,
        )
        .await
        .unwrap();
    }
    for i in 0..200 {
        ingest_line(
            &miner,
            &storage,
            IngestLine {
                raw_line: format!("burst event number {i}"),
                source: "heartbeat".to_string(),
                event_time_override: Some(now),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
    }

    let anomalies = run_detection_cycle(storage.clone(), now).await;
    assert!(
        anomalies.iter().any(|a| format!("{:?}", a.kind).contains("Volume")),
        "expected at least one volume-related anomaly, got {anomalies:?}"
    );
}

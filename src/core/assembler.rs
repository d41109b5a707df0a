// LogSleuth - core/assembler.rs
//
// Record Assembler (§4.E): merges classifier captures, extractor output, and
// the miner's verdict into a single `LogRecord`.

use crate::core::classifier::Classification;
use crate::core::extract;
use crate::core::miner_actor::ActorOutcome;
use crate::core::model::{LogRecord, NetworkInfo, Severity};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Maximum forward clock skew an `event_time` is allowed before it is
/// clamped to the ingestion time (§3 invariant).
const MAX_FORWARD_SKEW: Duration = Duration::hours(24);

/// One raw line plus the context the assembler needs but the classifier and
/// extractors don't carry (source, file association, ingestion clock).
pub struct AssemblyInput<'a> {
    pub raw_line: &'a str,
    pub source: String,
    pub file_id: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

/// Build a `LogRecord` from a classified line and the miner's verdict on its
/// (already-tokenized) message text (§4.E).
///
/// Field precedence (most to least specific):
/// 1. A structured capture/JSON field with the matching name.
/// 2. The generic extractor run over the free-text message.
/// 3. A default (e.g. `Severity::Info`, `ingested_at` for `event_time`).
pub fn assemble(input: AssemblyInput<'_>, classification: &Classification, miner: ActorOutcome) -> LogRecord {
    let mut parsed_fields = HashMap::new();
    let mut network = NetworkInfo::default();
    let mut severity = None;
    let mut event_time = None;
    let mut message = input.raw_line.to_string();
    let format_tag;

    match classification {
        Classification::Json(map) => {
            format_tag = "json".to_string();
            if let Some(v) = map.get("message").or_else(|| map.get("msg")) {
                if let Some(s) = v.as_str() {
                    message = s.to_string();
                }
            }
            if let Some(v) = map.get("level").or_else(|| map.get("severity")) {
                if let Some(s) = v.as_str() {
                    severity = Severity::from_label(s);
                }
            }
            event_time = extract::parse_json_timestamp(&serde_json::Value::Object(map.clone()));
            for (key, value) in map.iter() {
                if matches!(key.as_str(), "message" | "msg" | "level" | "severity" | "timestamp" | "time") {
                    continue;
                }
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                parsed_fields.insert(key.clone(), rendered);
            }
        }
        Classification::Matched { format_tag: tag, captures } => {
            format_tag = (*tag).to_string();
            if let Some(m) = captures.get("message") {
                message = m.clone();
            }
            if let Some(level_token) = captures.get("severity").or_else(|| captures.get("level")).or_else(|| captures.get("action")) {
                severity = super::registry::registry()
                    .iter()
                    .find(|e| e.name == *tag)
                    .and_then(|e| e.level_map.as_ref())
                    .and_then(|map| map.get(level_token.as_str()))
                    .copied();
            }
            if let Some(ts_raw) = captures.get("timestamp") {
                let fmt = super::registry::registry().iter().find(|e| e.name == *tag).and_then(|e| e.timestamp_format);
                event_time = fmt.and_then(|f| extract::parse_with_format(ts_raw, f));
            }
            if let Some(ip) = captures.get("src_ip") {
                network.src_ip = Some(ip.clone());
            }
            if let Some(ip) = captures.get("dst_ip") {
                network.dst_ip = Some(ip.clone());
            }
            if let Some(ip) = captures.get("remote_addr") {
                network.ip_address = Some(ip.clone());
            }
            if let Some(port) = captures.get("src_port").and_then(|p| p.parse().ok()) {
                network.src_port = Some(port);
            }
            if let Some(port) = captures.get("dst_port").and_then(|p| p.parse().ok()) {
                network.dst_port = Some(port);
            }
            if let Some(proto) = captures.get("protocol") {
                if let Some(name) = extract::numeric_protocol_name(proto) {
                    network.protocols.push(name.to_string());
                } else {
                    network.protocols.push(proto.to_ascii_uppercase());
                }
            }
            for (key, value) in captures.iter() {
                if key == "message" {
                    continue;
                }
                parsed_fields.insert(key.clone(), value.clone());
            }
        }
        Classification::Unknown => {
            format_tag = "unknown".to_string();
        }
    }

    let severity = severity.unwrap_or_else(|| extract::extract_severity(&message));

    // Network info is always re-derived from the free-text message and
    // unioned on top of structured captures, never overwriting them (§4.E).
    let from_message = extract::extract_network(&message);
    network.union_from(from_message);

    let mut event_time = event_time.unwrap_or(input.ingested_at);
    let mut event_time_clamped_from = None;
    if event_time - input.ingested_at > MAX_FORWARD_SKEW {
        event_time_clamped_from = Some(event_time);
        event_time = input.ingested_at;
    }

    LogRecord {
        id: String::new(),
        ingested_at: input.ingested_at,
        event_time,
        severity,
        message,
        source: input.source,
        format_tag,
        template_id: miner.template_id.to_string(),
        template: miner.template_string,
        cluster_size: miner.cluster_size,
        network,
        parsed_fields,
        metadata: HashMap::new(),
        file_id: input.file_id,
        event_time_clamped_from,
    }
}

/// Apply caller-supplied overrides from a structured ingest request (§6
/// `/api/logs/ingest`) on top of an already-assembled record. These are the
/// most explicit source available — more so than a registry capture — so
/// they win outright rather than being merged.
pub fn apply_overrides(record: &mut LogRecord, severity: Option<Severity>, event_time: Option<DateTime<Utc>>) {
    if let Some(severity) = severity {
        record.severity = severity;
    }
    if let Some(event_time) = event_time {
        if event_time - record.ingested_at > MAX_FORWARD_SKEW {
            record.event_time_clamped_from = Some(event_time);
            record.event_time = record.ingested_at;
        } else {
            record.event_time = event_time;
            record.event_time_clamped_from = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier;
    use crate::core::miner::{MinerConfig, TemplateMiner};

    fn outcome_for(miner: &mut TemplateMiner, message: &str) -> ActorOutcome {
        let outcome = miner.add_log_message(message);
        ActorOutcome {
            template_id: outcome.template_id.to_string(),
            template_string: outcome.template_string,
            cluster_size: outcome.cluster_size,
        }
    }

    #[test]
    fn assembles_syslog_line_with_severity_and_message() {
        let line = "Jul 10 12:00:01 host sshd[1234]: Failed password for root from 10.0.0.5 port 22 ssh2";
        let classification = classifier::classify(line);
        let mut miner = TemplateMiner::new(MinerConfig::default());
        let outcome = outcome_for(&mut miner, line);
        let record = assemble(
            AssemblyInput {
                raw_line: line,
                source: "test".into(),
                file_id: None,
                ingested_at: Utc::now(),
            },
            &classification,
            outcome,
        );
        assert_eq!(record.format_tag, "syslog");
        assert_eq!(record.severity, Severity::Error);
        assert!(record.message.starts_with("Failed password"));
        assert_eq!(record.network.ip_address.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn assembles_firewall_line_with_unioned_network_info() {
        let line = "Jul 10 12:00:01 fw kernel: IN=eth0 OUT= DENY SRC=1.2.3.4 DST=5.6.7.8 SPT=1000 DPT=22 PROTO=TCP";
        let classification = classifier::classify(line);
        let mut miner = TemplateMiner::new(MinerConfig::default());
        let outcome = outcome_for(&mut miner, line);
        let record = assemble(
            AssemblyInput {
                raw_line: line,
                source: "test".into(),
                file_id: None,
                ingested_at: Utc::now(),
            },
            &classification,
            outcome,
        );
        assert_eq!(record.severity, Severity::Warn);
        assert_eq!(record.network.src_ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(record.network.dst_ip.as_deref(), Some("5.6.7.8"));
        assert!(record.network.ports.contains(&1000));
        assert!(record.network.protocols.contains(&"TCP".to_string()));
    }

    #[test]
    fn clamps_excessive_forward_skew() {
        let now = Utc::now();
        let future = now + Duration::days(10);
        let line = format!("{} host program: message with skewed timestamp", future.format("%b %d %H:%M:%S"));
        let classification = classifier::classify(&line);
        let mut miner = TemplateMiner::new(MinerConfig::default());
        let outcome = outcome_for(&mut miner, &line);
        let record = assemble(
            AssemblyInput {
                raw_line: &line,
                source: "test".into(),
                file_id: None,
                ingested_at: now,
            },
            &classification,
            outcome,
        );
        assert_eq!(record.event_time, now);
        assert!(record.event_time_clamped_from.is_some());
    }

    #[test]
    fn unknown_line_still_gets_severity_and_template() {
        let line = "this line matches no registered format at all";
        let classification = classifier::classify(line);
        let mut miner = TemplateMiner::new(MinerConfig::default());
        let outcome = outcome_for(&mut miner, line);
        let record = assemble(
            AssemblyInput {
                raw_line: line,
                source: "test".into(),
                file_id: None,
                ingested_at: Utc::now(),
            },
            &classification,
            outcome,
        );
        assert_eq!(record.format_tag, "unknown");
        assert_eq!(record.severity, Severity::Info);
        assert!(!record.template_id.is_empty());
    }

    #[test]
    fn explicit_overrides_win_over_inferred_fields() {
        let line = "plain text line with no structured fields";
        let classification = classifier::classify(line);
        let mut miner = TemplateMiner::new(MinerConfig::default());
        let outcome = outcome_for(&mut miner, line);
        let now = Utc::now();
        let mut record = assemble(
            AssemblyInput {
                raw_line: line,
                source: "test".into(),
                file_id: None,
                ingested_at: now,
            },
            &classification,
            outcome,
        );
        assert_eq!(record.severity, Severity::Info);

        apply_overrides(&mut record, Some(Severity::Critical), Some(now - Duration::hours(1)));
        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.event_time, now - Duration::hours(1));
    }
}

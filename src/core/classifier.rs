// LogSleuth - core/classifier.rs
//
// Line Classifier (§4.B): decides which registry format (if any) matches a
// raw line and returns its captures, or `Unknown`.

use crate::core::registry::{self, FormatEntry};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub enum Classification {
    Json(serde_json::Map<String, serde_json::Value>),
    Matched {
        format_tag: &'static str,
        captures: HashMap<String, String>,
    },
    Unknown,
}

/// Classify a single non-empty, trimmed line (§4.B policy 1-3).
pub fn classify(line: &str) -> Classification {
    let trimmed = line.trim();

    if trimmed.starts_with('{') {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
            return Classification::Json(map);
        }
    }

    for entry in registry::registry() {
        if let Some(captures) = try_match(entry, trimmed) {
            return Classification::Matched {
                format_tag: entry.name,
                captures,
            };
        }
    }

    Classification::Unknown
}

fn try_match(entry: &FormatEntry, line: &str) -> Option<HashMap<String, String>> {
    // Whether a format's fields are anchored start-to-end or positional
    // within a larger wrapper line (firewall) is already encoded in the
    // pattern itself (`^...$` vs. unanchored); `Regex::captures` performs
    // substring search either way.
    let caps = entry.pattern.captures(line)?;

    let names: Vec<&str> = entry.pattern.capture_names().flatten().collect();
    let mut out = HashMap::with_capacity(names.len());
    for name in names {
        if let Some(m) = caps.name(name) {
            out.insert(name.to_string(), m.as_str().to_string());
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_json_object_lines() {
        let line = r#"{"level":"error","message":"db down"}"#;
        match classify(line) {
            Classification::Json(map) => assert_eq!(map.get("level").unwrap(), "error"),
            other => panic!("expected Json, got {other:?}"),
        }
    }

    #[test]
    fn classifies_syslog_line() {
        let line = "Jul 10 12:00:01 host sshd[1234]: Failed password for root from 10.0.0.5 port 22 ssh2";
        match classify(line) {
            Classification::Matched { format_tag, .. } => assert_eq!(format_tag, "syslog"),
            other => panic!("expected Matched(syslog), got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_unknown() {
        let line = "this line matches no registered format at all";
        assert!(matches!(classify(line), Classification::Unknown));
    }
}

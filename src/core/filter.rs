// LogSleuth - core/filter.rs
//
// Query filter (§6 `/api/logs/query`): a composable, AND-combined predicate
// over persisted records. All fields are pure data plus a pure `matches`
// function here; the storage adapter translates the same struct into its
// backend's native query (§4.F), so this module stays dependency-free of
// any storage crate.

use crate::core::model::{LogRecord, Severity};
use chrono::{DateTime, Utc};

use crate::util::constants::DEFAULT_QUERY_LIMIT;

/// Complete query filter. All set fields are AND-combined.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub template_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub level: Option<Severity>,
    /// Case-insensitive substring match against `source`.
    pub source: Option<String>,
    /// Case-insensitive substring match against `message`.
    pub message: Option<String>,
    pub file_id: Option<String>,
    pub format_tag: Option<String>,
    /// `Some(true)` adds a "network map is non-empty" predicate. `None` and
    /// `Some(false)` add no predicate (§9 Open Question decision).
    pub has_network_info: Option<bool>,
    pub protocol: Option<String>,
    pub ip_address: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_QUERY_LIMIT,
            ..Default::default()
        }
    }

    /// True if every configured predicate is absent; used by the storage
    /// adapter to skip query-building for an unfiltered page request.
    pub fn is_empty(&self) -> bool {
        self.template_id.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.level.is_none()
            && self.source.is_none()
            && self.message.is_none()
            && self.file_id.is_none()
            && self.format_tag.is_none()
            && self.has_network_info.is_none()
            && self.protocol.is_none()
            && self.ip_address.is_none()
    }

    /// Evaluate the filter against one record. Used by the in-memory
    /// reference path and by tests; the SQLite adapter builds an equivalent
    /// `WHERE` clause instead of calling this per-row.
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(ref id) = self.template_id {
            if &record.template_id != id {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if record.event_time < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if record.event_time > end {
                return false;
            }
        }
        if let Some(level) = self.level {
            if record.severity != level {
                return false;
            }
        }
        if let Some(ref needle) = self.source {
            if !record.source.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(ref needle) = self.message {
            if !record.message.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(ref id) = self.file_id {
            if record.file_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(ref tag) = self.format_tag {
            if &record.format_tag != tag {
                return false;
            }
        }
        if self.has_network_info == Some(true) && record.network.is_empty() {
            return false;
        }
        if let Some(ref proto) = self.protocol {
            if !record
                .network
                .protocols
                .iter()
                .any(|p| p.eq_ignore_ascii_case(proto))
            {
                return false;
            }
        }
        if let Some(ref ip) = self.ip_address {
            let matches_ip = record.network.ip_address.as_deref() == Some(ip.as_str())
                || record.network.src_ip.as_deref() == Some(ip.as_str())
                || record.network.dst_ip.as_deref() == Some(ip.as_str())
                || record.network.ip_addresses.iter().any(|candidate| candidate == ip);
            if !matches_ip {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::NetworkInfo;
    use std::collections::HashMap;

    fn record(severity: Severity, message: &str, source: &str) -> LogRecord {
        LogRecord {
            id: "1".into(),
            ingested_at: Utc::now(),
            event_time: Utc::now(),
            severity,
            message: message.to_string(),
            source: source.to_string(),
            format_tag: "syslog".into(),
            template_id: "1".into(),
            template: "<*>".into(),
            cluster_size: 1,
            network: NetworkInfo::default(),
            parsed_fields: HashMap::new(),
            metadata: HashMap::new(),
            file_id: None,
            event_time_clamped_from: None,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = QueryFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&record(Severity::Info, "hello", "host-a")));
    }

    #[test]
    fn level_filter_excludes_other_severities() {
        let filter = QueryFilter {
            level: Some(Severity::Error),
            ..Default::default()
        };
        assert!(!filter.matches(&record(Severity::Info, "hello", "host-a")));
        assert!(filter.matches(&record(Severity::Error, "hello", "host-a")));
    }

    #[test]
    fn source_and_message_substrings_are_case_insensitive() {
        let filter = QueryFilter {
            source: Some("HOST".into()),
            message: Some("FAIL".into()),
            ..Default::default()
        };
        assert!(filter.matches(&record(Severity::Error, "connection failed", "host-a")));
        assert!(!filter.matches(&record(Severity::Error, "connection ok", "host-a")));
    }

    #[test]
    fn has_network_info_true_requires_non_empty_network_map() {
        let mut with_net = record(Severity::Info, "hello", "host-a");
        with_net.network.ip_address = Some("10.0.0.1".into());
        let without_net = record(Severity::Info, "hello", "host-a");

        let filter = QueryFilter {
            has_network_info: Some(true),
            ..Default::default()
        };
        assert!(filter.matches(&with_net));
        assert!(!filter.matches(&without_net));
    }

    #[test]
    fn has_network_info_false_or_none_adds_no_predicate() {
        let without_net = record(Severity::Info, "hello", "host-a");
        assert!(QueryFilter {
            has_network_info: Some(false),
            ..Default::default()
        }
        .matches(&without_net));
        assert!(QueryFilter {
            has_network_info: None,
            ..Default::default()
        }
        .matches(&without_net));
    }
}

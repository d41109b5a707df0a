// LogSleuth - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no HTTP,
// no storage-backend dependencies (Atlas Layer Rule: Core depends on std
// plus chrono/serde only).
//
// These types are the shared vocabulary across all layers: classifier,
// extractors, miner, assembler, storage adapter, and the HTTP facade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Severity
// =============================================================================

/// Normalised severity levels, ordered from most to least severe.
///
/// All format-specific level strings (error, ERR, Failed, syslog priority
/// numbers, ...) are mapped to one of these variants by the field extractors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warn,
    Notice,
    #[default]
    Info,
    Debug,
}

impl Severity {
    /// Returns all variants in display order (most severe first).
    pub fn all() -> &'static [Severity] {
        &[
            Severity::Emergency,
            Severity::Alert,
            Severity::Critical,
            Severity::Error,
            Severity::Warn,
            Severity::Notice,
            Severity::Info,
            Severity::Debug,
        ]
    }

    /// Maps a syslog-style facility.severity priority value (`<N>`, already
    /// reduced modulo 8) onto a `Severity`.
    pub fn from_syslog_priority(priority: u8) -> Severity {
        match priority % 8 {
            0 => Severity::Emergency,
            1 => Severity::Alert,
            2 => Severity::Critical,
            3 => Severity::Error,
            4 => Severity::Warn,
            5 => Severity::Notice,
            6 => Severity::Info,
            _ => Severity::Debug,
        }
    }

    /// Case-insensitive match of a free-text level token (e.g. a JSON
    /// record's `level`/`severity` field, or a Cisco `level_map` entry).
    pub fn from_label(label: &str) -> Option<Severity> {
        match label.to_ascii_uppercase().as_str() {
            "EMERGENCY" | "EMERG" | "PANIC" => Some(Severity::Emergency),
            "ALERT" => Some(Severity::Alert),
            "CRITICAL" | "CRIT" | "FATAL" => Some(Severity::Critical),
            "ERROR" | "ERR" | "FAIL" | "FAILED" => Some(Severity::Error),
            "WARNING" | "WARN" | "NOTICE" => Some(Severity::Warn),
            "INFO" | "INFORMATION" => Some(Severity::Info),
            "DEBUG" | "TRACE" => Some(Severity::Debug),
            _ => None,
        }
    }

    /// `true` for the severities the anomaly detector's error-rate strategy
    /// counts as "error-like" (§4.H.2: ERROR, CRITICAL, FATAL-mapped, WARN).
    /// FATAL has no distinct variant here; `from_label` already folds it
    /// into `Critical`.
    pub fn counts_as_error_rate(&self) -> bool {
        matches!(self, Severity::Critical | Severity::Error | Severity::Warn)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Emergency => "EMERGENCY",
            Severity::Alert => "ALERT",
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
            Severity::Notice => "NOTICE",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Network info
// =============================================================================

/// Network entities extracted (or unioned) from a record's message/captures.
///
/// Construction is additive: the field extractors union message-derived
/// entities into whatever the format registry's structured captures already
/// produced (§4.C, §4.E), never overwriting an existing key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mac_addresses: Vec<String>,
}

impl NetworkInfo {
    pub fn is_empty(&self) -> bool {
        self.src_ip.is_none()
            && self.dst_ip.is_none()
            && self.ip_address.is_none()
            && self.src_port.is_none()
            && self.dst_port.is_none()
            && self.ip_addresses.is_empty()
            && self.ports.is_empty()
            && self.protocols.is_empty()
            && self.mac_addresses.is_empty()
    }

    /// Union `other` into `self` without overwriting any key `self` already
    /// has set (§4.E: "network info from the message is unioned ... never
    /// overwrites existing keys").
    pub fn union_from(&mut self, other: NetworkInfo) {
        if self.src_ip.is_none() {
            self.src_ip = other.src_ip;
        }
        if self.dst_ip.is_none() {
            self.dst_ip = other.dst_ip;
        }
        if self.ip_address.is_none() {
            self.ip_address = other.ip_address;
        }
        if self.src_port.is_none() {
            self.src_port = other.src_port;
        }
        if self.dst_port.is_none() {
            self.dst_port = other.dst_port;
        }
        for ip in other.ip_addresses {
            if !self.ip_addresses.contains(&ip) {
                self.ip_addresses.push(ip);
            }
        }
        for port in other.ports {
            if !self.ports.contains(&port) {
                self.ports.push(port);
            }
        }
        for proto in other.protocols {
            if !self.protocols.contains(&proto) {
                self.protocols.push(proto);
            }
        }
        for mac in other.mac_addresses {
            if !self.mac_addresses.contains(&mac) {
                self.mac_addresses.push(mac);
            }
        }
    }
}

// =============================================================================
// LogRecord — the canonical unit (§3)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Opaque string, storage-assigned. Empty until `insert_record` returns.
    #[serde(default)]
    pub id: String,

    pub ingested_at: DateTime<Utc>,
    pub event_time: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    pub source: String,

    /// One of the registry entry names, or "unknown"/"json".
    pub format_tag: String,

    pub template_id: String,
    pub template: String,
    pub cluster_size: u64,

    #[serde(default)]
    pub network: NetworkInfo,

    #[serde(default)]
    pub parsed_fields: HashMap<String, String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,

    /// Set when `event_time` was clamped for exceeding the allowed forward
    /// skew (§3 invariant); carries the original out-of-range value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time_clamped_from: Option<DateTime<Utc>>,
}

// =============================================================================
// Template — the miner's output (§3)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub template_id: String,
    pub template_string: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub count: u64,
}

// =============================================================================
// FileUpload manifest (§3)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileUploadStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpload {
    pub file_id: String,
    pub original_name: String,
    pub stored_name: String,
    pub byte_size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub status: FileUploadStatus,
    pub processed_logs: u64,
    pub failed_logs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// =============================================================================
// Anomaly (§3)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    VolumeSpike,
    VolumeDrop,
    HighErrorRate,
    NewTemplateSurge,
    RareTemplateActivity,
    MlDetectedAnomaly,
    SourceSilence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub event_time: DateTime<Utc>,
    pub kind: AnomalyKind,
    pub severity: AnomalySeverity,
    pub description: String,
    #[serde(default)]
    pub affected_templates: Vec<String>,
    pub log_count: u64,
    pub score: f64,
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_most_severe_first() {
        assert!(Severity::Emergency < Severity::Debug);
        assert!(Severity::Critical < Severity::Warn);
    }

    #[test]
    fn syslog_priority_maps_modulo_eight() {
        assert_eq!(Severity::from_syslog_priority(3), Severity::Error);
        assert_eq!(Severity::from_syslog_priority(11), Severity::Error);
    }

    #[test]
    fn network_info_union_never_overwrites() {
        let mut a = NetworkInfo {
            src_ip: Some("10.0.0.1".into()),
            ..Default::default()
        };
        let b = NetworkInfo {
            src_ip: Some("10.0.0.2".into()),
            dst_ip: Some("10.0.0.3".into()),
            ..Default::default()
        };
        a.union_from(b);
        assert_eq!(a.src_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(a.dst_ip.as_deref(), Some("10.0.0.3"));
    }

    #[test]
    fn network_info_union_dedupes_lists() {
        let mut a = NetworkInfo {
            ports: vec![22],
            ..Default::default()
        };
        let b = NetworkInfo {
            ports: vec![22, 80],
            ..Default::default()
        };
        a.union_from(b);
        assert_eq!(a.ports, vec![22, 80]);
    }
}

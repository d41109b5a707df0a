// LogSleuth - core/extract.rs
//
// Field Extractors (§4.C): severity extraction, network entity extraction,
// and timestamp parsing that operate on classifier captures or directly on
// the raw message for augmentation.

use crate::core::model::{NetworkInfo, Severity};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

// =============================================================================
// Severity extraction (§4.C)
// =============================================================================

static LEVEL_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static SYSLOG_PRIORITY: OnceLock<Regex> = OnceLock::new();

fn level_patterns() -> &'static [Regex] {
    LEVEL_PATTERNS.get_or_init(|| {
        // Priority order, highest severity first (§4.C.1).
        [
            r"(?i)\b(EMERGENCY|EMERG|PANIC)\b",
            r"(?i)\b(ALERT)\b",
            r"(?i)\b(CRITICAL|CRIT|FATAL)\b",
            r"(?i)\b(ERROR|ERR|FAILED|FAIL)\b",
            r"(?i)\b(WARNING|WARN|NOTICE)\b",
            r"(?i)\b(INFO|INFORMATION)\b",
            r"(?i)\b(DEBUG|TRACE)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static level pattern"))
        .collect()
    })
}

fn syslog_priority_pattern() -> &'static Regex {
    SYSLOG_PRIORITY.get_or_init(|| Regex::new(r"<(\d+)>").expect("static syslog priority pattern"))
}

/// Pure function of `message` (§8 property 4: severity determinism).
///
/// Implements the four-step fallback chain in §4.C: explicit keyword >
/// syslog `<N>` priority > heuristic keyword > INFO default.
pub fn extract_severity(message: &str) -> Severity {
    for pattern in level_patterns() {
        if let Some(caps) = pattern.captures(message) {
            if let Some(label) = caps.get(1) {
                if let Some(sev) = Severity::from_label(label.as_str()) {
                    return sev;
                }
            }
        }
    }

    if let Some(caps) = syslog_priority_pattern().captures(message) {
        if let Ok(priority) = caps[1].parse::<u32>() {
            return Severity::from_syslog_priority((priority % 8) as u8);
        }
    }

    let upper = message.to_ascii_uppercase();
    let has_any = |words: &[&str]| words.iter().any(|w| upper.contains(w));
    if has_any(&["FAIL", "ERROR", "EXCEPTION", "CRASH"]) {
        return Severity::Error;
    }
    if has_any(&["WARN", "ALERT", "DENY", "BLOCK"]) {
        return Severity::Warn;
    }
    if has_any(&["DEBUG", "TRACE"]) {
        return Severity::Debug;
    }

    Severity::Info
}

// =============================================================================
// Network extraction (§4.C)
// =============================================================================

static IP_PATTERN: OnceLock<Regex> = OnceLock::new();
static PORT_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static PROTO_LABELED_PATTERN: OnceLock<Regex> = OnceLock::new();
static PROTO_BARE_PATTERN: OnceLock<Regex> = OnceLock::new();
static MAC_PATTERN: OnceLock<Regex> = OnceLock::new();

fn ip_pattern() -> &'static Regex {
    IP_PATTERN.get_or_init(|| {
        Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").expect("static ip pattern")
    })
}

fn port_patterns() -> &'static [Regex] {
    PORT_PATTERNS.get_or_init(|| {
        [
            r"(?i)(?:port)\s*[=:]\s*(\d+)",
            r"(?i)(?:src_port|SPT)\s*[=:]\s*(\d+)",
            r"(?i)(?:dst_port|DPT)\s*[=:]\s*(\d+)",
            r":(\d+)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static port pattern"))
        .collect()
    })
}

fn proto_labeled_pattern() -> &'static Regex {
    PROTO_LABELED_PATTERN
        .get_or_init(|| Regex::new(r"(?i)(?:proto|protocol)\s*[=:]\s*(\w+)").expect("static proto labeled"))
}

fn proto_bare_pattern() -> &'static Regex {
    PROTO_BARE_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(TCP|UDP|ICMP|HTTP|HTTPS|FTP|SSH|SMTP|DNS|DHCP|SNMP)\b")
            .expect("static proto bare")
    })
}

fn mac_pattern() -> &'static Regex {
    MAC_PATTERN.get_or_init(|| {
        Regex::new(r"\b((?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2})\b").expect("static mac pattern")
    })
}

/// Numeric protocol -> name mapping (§4.C).
pub fn numeric_protocol_name(token: &str) -> Option<&'static str> {
    match token {
        "1" => Some("ICMP"),
        "6" => Some("TCP"),
        "17" => Some("UDP"),
        "47" => Some("GRE"),
        "50" => Some("ESP"),
        "51" => Some("AH"),
        "58" => Some("ICMPv6"),
        "89" => Some("OSPF"),
        "132" => Some("SCTP"),
        _ => None,
    }
}

/// Extract network entities from free text (§4.C). Always run, even over
/// structured-capture-derived messages; the caller unions the result.
pub fn extract_network(message: &str) -> NetworkInfo {
    let mut net = NetworkInfo::default();

    let ips: Vec<String> = ip_pattern()
        .captures_iter(message)
        .map(|c| c[1].to_string())
        .collect();
    if ips.len() >= 2 {
        net.src_ip = Some(ips[0].clone());
        net.dst_ip = Some(ips[1].clone());
    } else if ips.len() == 1 {
        net.ip_address = Some(ips[0].clone());
    }
    net.ip_addresses = ips;

    let mut ports: Vec<u16> = Vec::new();
    for pattern in port_patterns() {
        for caps in pattern.captures_iter(message) {
            if let Ok(port) = caps[1].parse::<u32>() {
                if (1..=65535).contains(&port) {
                    let port = port as u16;
                    if !ports.contains(&port) {
                        ports.push(port);
                    }
                }
            }
        }
    }
    net.ports = ports;

    let mut protocols: Vec<String> = Vec::new();
    for caps in proto_labeled_pattern().captures_iter(message) {
        let proto = caps[1].to_ascii_uppercase();
        if !protocols.contains(&proto) {
            protocols.push(proto);
        }
    }
    for caps in proto_bare_pattern().captures_iter(message) {
        let proto = caps[1].to_ascii_uppercase();
        if !protocols.contains(&proto) {
            protocols.push(proto);
        }
    }
    net.protocols = protocols;

    net.mac_addresses = mac_pattern()
        .captures_iter(message)
        .map(|c| c[1].to_string())
        .collect();

    net
}

// =============================================================================
// Timestamp extraction (§4.C)
// =============================================================================

/// Parse a timestamp string with an explicit format, as registry entries
/// declare (§4.A). Syslog/cisco/windows_event formats are year-less or
/// otherwise ambiguous in ways the reference `strptime` also tolerates;
/// `%Y`-less formats are stamped with the current year.
pub fn parse_with_format(raw: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(raw, format) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }
    if !format.contains("%Y") && !format.contains("%y") {
        let current_year = Utc::now().format("%Y").to_string();
        let with_year = format!("{current_year} {raw}");
        let with_year_format = format!("%Y {format}");
        if let Ok(naive) = NaiveDateTime::parse_from_str(&with_year, &with_year_format) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }
    None
}

/// JSON timestamp extraction: checks `timestamp` then `time`, rewriting a
/// trailing `Z` to `+00:00` before parsing as RFC 3339 (§4.C).
pub fn parse_json_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let raw = value
        .get("timestamp")
        .or_else(|| value.get("time"))
        .and_then(|v| v.as_str())?;
    let normalized = if raw.ends_with('Z') {
        format!("{}+00:00", &raw[..raw.len() - 1])
    } else {
        raw.to_string()
    };
    DateTime::parse_from_rfc3339(&normalized)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_severity_is_pure_and_prioritizes_explicit_keyword() {
        assert_eq!(extract_severity("system CRITICAL failure"), Severity::Critical);
        assert_eq!(
            extract_severity("system CRITICAL failure"),
            extract_severity("system CRITICAL failure")
        );
    }

    #[test]
    fn extract_severity_falls_back_to_syslog_priority() {
        assert_eq!(extract_severity("<11>some message"), Severity::Error);
    }

    #[test]
    fn extract_severity_falls_back_to_heuristic_keyword() {
        assert_eq!(extract_severity("connection refused, deny this host"), Severity::Warn);
    }

    #[test]
    fn extract_severity_defaults_to_info() {
        assert_eq!(extract_severity("server started on port 8080"), Severity::Info);
    }

    #[test]
    fn network_extraction_picks_first_two_ips_as_src_dst() {
        let net = extract_network("DENY SRC=1.2.3.4 DST=5.6.7.8 SPT=1000 DPT=22 PROTO=TCP");
        assert_eq!(net.src_ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(net.dst_ip.as_deref(), Some("5.6.7.8"));
        assert!(net.ports.contains(&1000));
        assert!(net.ports.contains(&22));
        assert!(net.protocols.contains(&"TCP".to_string()));
    }

    #[test]
    fn network_extraction_rejects_out_of_range_ports() {
        let net = extract_network("port=0 port=65536 port=443");
        assert_eq!(net.ports, vec![443]);
    }

    #[test]
    fn network_extraction_does_not_validate_octet_ranges() {
        // Boundary case (§8): matches the IP regex lexically, no range check.
        let net = extract_network("from 999.999.999.999 to nowhere");
        assert_eq!(net.ip_address.as_deref(), Some("999.999.999.999"));
    }

    #[test]
    fn numeric_protocol_mapping() {
        assert_eq!(numeric_protocol_name("6"), Some("TCP"));
        assert_eq!(numeric_protocol_name("17"), Some("UDP"));
        assert_eq!(numeric_protocol_name("9999"), None);
    }

    #[test]
    fn json_timestamp_rewrites_trailing_z() {
        let v = serde_json::json!({"timestamp": "2024-07-10T12:00:01Z"});
        let ts = parse_json_timestamp(&v).expect("should parse");
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2024-07-10");
    }
}

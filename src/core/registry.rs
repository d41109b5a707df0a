// LogSleuth - core/registry.rs
//
// Format Registry (§4.A): a static, immutable-at-runtime catalog of named
// line patterns. Mirrors the structure of the existing `FormatProfile`
// machinery (regex + optional timestamp format + optional severity map)
// but the catalog itself is compiled in, not loaded from TOML — the spec's
// non-goals explicitly exclude user-defined parsing grammars.
//
// An implementer adds an entry by appending a tuple to `build_registry`;
// no dynamic reflection, no profile directory scanning.

use crate::core::model::Severity;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// One catalog entry: a compiled regex with named captures, plus the
/// optional timestamp format and severity-label map the reference formats
/// carry alongside their pattern.
pub struct FormatEntry {
    pub name: &'static str,
    pub pattern: Regex,
    pub timestamp_format: Option<&'static str>,
    /// Maps a captured token (e.g. cisco's numeric `severity`, firewall's
    /// `action`) to a `Severity`, when the registry entry can assign one
    /// without falling through to the generic severity extractor.
    pub level_map: Option<HashMap<&'static str, Severity>>,
}

static REGISTRY: OnceLock<Vec<FormatEntry>> = OnceLock::new();

/// Returns the compiled, declared-order format registry.
///
/// Order matters (§4.B): more specific entries are declared before more
/// general ones that could also match (`cisco_syslog` before `syslog`).
pub fn registry() -> &'static [FormatEntry] {
    REGISTRY.get_or_init(build_registry)
}

fn build_registry() -> Vec<FormatEntry> {
    vec![
        FormatEntry {
            name: "cisco_syslog",
            pattern: Regex::new(
                r"^(?P<timestamp>\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2}(?:\.\d{3})?)\s*(?P<timezone>\S+)?\s*:?\s*%?(?P<facility>\w+)-(?P<severity>\d+)-(?P<mnemonic>\w+):\s*(?P<message>.*)$",
            )
            .expect("static cisco_syslog pattern"),
            timestamp_format: None,
            level_map: Some(
                [
                    ("0", Severity::Emergency),
                    ("1", Severity::Alert),
                    ("2", Severity::Critical),
                    ("3", Severity::Error),
                    ("4", Severity::Warn),
                    ("5", Severity::Notice),
                    ("6", Severity::Info),
                    ("7", Severity::Debug),
                ]
                .into_iter()
                .collect(),
            ),
        },
        FormatEntry {
            name: "syslog",
            pattern: Regex::new(
                r"^(?P<timestamp>\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\s+(?P<hostname>\S+)\s+(?P<program>\S+?)(?:\[(?P<pid>\d+)\])?:\s*(?P<message>.*)$",
            )
            .expect("static syslog pattern"),
            timestamp_format: Some("%b %d %H:%M:%S"),
            level_map: None,
        },
        FormatEntry {
            name: "apache_access",
            pattern: Regex::new(
                r#"^(?P<remote_addr>\S+)\s+\S+\s+\S+\s+\[(?P<timestamp>[^\]]+)\]\s+"(?P<method>\S+)\s+(?P<url>\S+)\s+(?P<protocol>\S+)"\s+(?P<status>\d+)\s+(?P<size>\S+)(?:\s+"(?P<referer>[^"]*)")?\s*(?:"(?P<user_agent>[^"]*)")?"#,
            )
            .expect("static apache_access pattern"),
            timestamp_format: Some("%d/%b/%Y:%H:%M:%S %z"),
            level_map: None,
        },
        FormatEntry {
            name: "nginx_access",
            pattern: Regex::new(
                r#"^(?P<remote_addr>\S+)\s+-\s+\S+\s+\[(?P<timestamp>[^\]]+)\]\s+"(?P<method>\S+)\s+(?P<url>\S+)\s+(?P<protocol>\S+)"\s+(?P<status>\d+)\s+(?P<size>\S+)\s+"(?P<referer>[^"]*)"\s+"(?P<user_agent>[^"]*)""#,
            )
            .expect("static nginx_access pattern"),
            timestamp_format: Some("%d/%b/%Y:%H:%M:%S %z"),
            level_map: None,
        },
        FormatEntry {
            name: "firewall",
            pattern: Regex::new(
                r"(?P<action>ACCEPT|DENY|DROP|REJECT).*?SRC=(?P<src_ip>\d+\.\d+\.\d+\.\d+).*?DST=(?P<dst_ip>\d+\.\d+\.\d+\.\d+)(?:.*?SPT=(?P<src_port>\d+))?(?:.*?DPT=(?P<dst_port>\d+))?(?:.*?PROTO=(?P<protocol>\w+))?",
            )
            .expect("static firewall pattern"),
            timestamp_format: None,
            level_map: Some(
                [
                    ("ACCEPT", Severity::Info),
                    ("DENY", Severity::Warn),
                    ("DROP", Severity::Warn),
                    ("REJECT", Severity::Error),
                ]
                .into_iter()
                .collect(),
            ),
        },
        FormatEntry {
            name: "windows_event",
            pattern: Regex::new(
                r"^(?P<timestamp>\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2})\s+(?P<level>\w+)\s+(?P<event_id>\d+)\s+(?P<source>\S+)\s+(?P<message>.*)$",
            )
            .expect("static windows_event pattern"),
            timestamp_format: Some("%Y-%m-%d %H:%M:%S"),
            level_map: None,
        },
        FormatEntry {
            name: "docker",
            pattern: Regex::new(
                r"^(?P<timestamp>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+Z)\s+(?P<level>\w+)\s+(?P<container_id>\w+)\s+(?P<message>.*)$",
            )
            .expect("static docker pattern"),
            timestamp_format: Some("%Y-%m-%dT%H:%M:%S%.fZ"),
            level_map: None,
        },
        FormatEntry {
            name: "json_structured",
            // Brace-wrapped lines that the classifier's direct JSON branch
            // already tried and failed to parse as a valid object fall
            // through here; declared last since nothing else matches a
            // leading `{`. No named captures: the line is malformed JSON,
            // so only the format tag is recoverable, not structured fields.
            pattern: Regex::new(r"^\{.*\}$").expect("static json_structured pattern"),
            timestamp_format: None,
            level_map: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_declares_cisco_before_generic_syslog() {
        let names: Vec<_> = registry().iter().map(|e| e.name).collect();
        let cisco_idx = names.iter().position(|n| *n == "cisco_syslog").unwrap();
        let syslog_idx = names.iter().position(|n| *n == "syslog").unwrap();
        assert!(cisco_idx < syslog_idx);
    }

    #[test]
    fn syslog_pattern_matches_ssh_failure_line() {
        let entry = registry().iter().find(|e| e.name == "syslog").unwrap();
        let line = "Jul 10 12:00:01 host sshd[1234]: Failed password for root from 10.0.0.5 port 22 ssh2";
        let caps = entry.pattern.captures(line).expect("syslog should match");
        assert_eq!(&caps["hostname"], "host");
        assert!(caps["message"].starts_with("Failed password"));
    }

    #[test]
    fn apache_pattern_matches_combined_log_line() {
        let entry = registry().iter().find(|e| e.name == "apache_access").unwrap();
        let line = r#"192.168.1.10 - - [10/Jul/2024:12:00:01 +0000] "GET /a HTTP/1.1" 200 512"#;
        let caps = entry.pattern.captures(line).expect("apache should match");
        assert_eq!(&caps["remote_addr"], "192.168.1.10");
        assert_eq!(&caps["status"], "200");
    }

    #[test]
    fn firewall_pattern_matches_inside_wrapper_text() {
        let entry = registry().iter().find(|e| e.name == "firewall").unwrap();
        let line = "Jul 10 12:00:01 fw kernel: IN=eth0 OUT= DENY SRC=1.2.3.4 DST=5.6.7.8 SPT=1000 DPT=22 PROTO=TCP";
        let caps = entry.pattern.captures(line).expect("firewall should match");
        assert_eq!(&caps["action"], "DENY");
        assert_eq!(&caps["src_ip"], "1.2.3.4");
        assert_eq!(&caps["protocol"], "TCP");
    }
}

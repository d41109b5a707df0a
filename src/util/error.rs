// LogSleuth - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation.
// All errors preserve the causal chain for diagnostic logging.
//
// Maps onto the five domain error kinds this service distinguishes
// (`bad_input`, `parse_failure`, `miner_degraded`, `storage_unavailable`,
// `cycle_error`, §7): `Ingest` and `Query` carry `bad_input`, `Storage`
// carries `storage_unavailable`, `Anomaly` carries `cycle_error`.
// `parse_failure` and `miner_degraded` are per-line outcomes folded into
// ingestion counters rather than surfaced as errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors related to the storage adapter (`storage_unavailable`, §7).
#[derive(Debug)]
pub enum StorageError {
    /// Could not establish or obtain a pooled connection.
    Connection { url: String, source: sqlx::Error },

    /// A query or statement failed after a connection was obtained.
    Query { operation: &'static str, source: sqlx::Error },

    /// A required index or table was missing and migration failed.
    Migration { source: sqlx::Error },

    /// A row's JSON column failed to (de)serialize.
    Encoding {
        operation: &'static str,
        source: serde_json::Error,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { url, source } => {
                write!(f, "could not connect to storage '{url}': {source}")
            }
            Self::Query { operation, source } => {
                write!(f, "storage operation '{operation}' failed: {source}")
            }
            Self::Migration { source } => write!(f, "storage migration failed: {source}"),
            Self::Encoding { operation, source } => {
                write!(f, "storage encoding error during '{operation}': {source}")
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connection { source, .. } => Some(source),
            Self::Query { source, .. } => Some(source),
            Self::Migration { source } => Some(source),
            Self::Encoding { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Ingest errors
// ---------------------------------------------------------------------------

/// Errors related to single and batch ingestion requests (`bad_input`, §7).
#[derive(Debug)]
pub enum IngestError {
    /// The uploaded file's extension is not in the allowed set.
    UnsupportedExtension { extension: String },

    /// The uploaded payload exceeds the configured size limit.
    PayloadTooLarge { size: u64, max_size: u64 },

    /// The request body could not be decoded (multipart, JSON, etc).
    MalformedRequest { reason: String },

    /// Upstream storage failure surfaced while ingesting.
    Storage(StorageError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedExtension { extension } => {
                write!(f, "unsupported file extension '{extension}'")
            }
            Self::PayloadTooLarge { size, max_size } => write!(
                f,
                "upload of {size} bytes exceeds maximum of {max_size} bytes"
            ),
            Self::MalformedRequest { reason } => write!(f, "malformed request: {reason}"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for IngestError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// Errors related to `/api/logs/query` and related read endpoints
/// (`bad_input`, §7).
#[derive(Debug)]
pub enum QueryError {
    /// A filter field could not be parsed (bad timestamp, bad enum value).
    InvalidFilter { field: &'static str, reason: String },

    /// `limit` exceeds the configured maximum page size.
    LimitTooLarge { limit: u64, max: u64 },

    /// Upstream storage failure surfaced while querying.
    Storage(StorageError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter { field, reason } => {
                write!(f, "invalid filter field '{field}': {reason}")
            }
            Self::LimitTooLarge { limit, max } => {
                write!(f, "limit {limit} exceeds maximum of {max}")
            }
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for QueryError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Anomaly detection errors
// ---------------------------------------------------------------------------

/// Errors related to a single anomaly-detection strategy (`cycle_error`,
/// §7). The detection cycle logs these and continues with the remaining
/// strategies; they never abort the cycle.
#[derive(Debug)]
pub enum AnomalyError {
    /// The strategy could not pull its input window from storage.
    WindowUnavailable { strategy: &'static str, source: StorageError },

    /// The strategy's own computation failed (e.g. insufficient data).
    ComputationFailed { strategy: &'static str, reason: String },
}

impl fmt::Display for AnomalyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowUnavailable { strategy, source } => {
                write!(f, "strategy '{strategy}' could not read its window: {source}")
            }
            Self::ComputationFailed { strategy, reason } => {
                write!(f, "strategy '{strategy}' failed: {reason}")
            }
        }
    }
}

impl std::error::Error for AnomalyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::WindowUnavailable { source, .. } => Some(source),
            Self::ComputationFailed { .. } => None,
        }
    }
}

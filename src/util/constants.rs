// LogSleuth - util/constants.rs
//
// Single source of truth for named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogSleuth";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogSleuth";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Storage database file name, used to derive the default SQLite path under
/// the platform data directory when `LOGSLEUTH_STORAGE_URL` is unset.
pub const STORAGE_DB_FILE_NAME: &str = "logsleuth.sqlite3";

// =============================================================================
// Template miner (Drain-family parse tree)
// =============================================================================

/// Fixed parse-tree depth: 1 length-group level + (depth - 1) token-branch
/// levels before the leaf cluster bucket.
pub const DRAIN_DEPTH: usize = 4;

/// Minimum configurable similarity threshold.
pub const MIN_DRAIN_SIM_THRESHOLD: f64 = 0.0;

/// Fraction of non-wildcard template positions that must literally match an
/// incoming line for it to join an existing cluster.
pub const DRAIN_SIM_THRESHOLD: f64 = 0.4;

/// Maximum configurable similarity threshold (1.0 = exact-token match only).
pub const MAX_DRAIN_SIM_THRESHOLD: f64 = 1.0;

/// Maximum clusters held in a single leaf bucket before LRU eviction.
pub const DRAIN_MAX_CHILDREN: usize = 100;

/// Process-wide cluster cap; the miner evicts the globally least-recently
/// matched cluster across all leaves once this is exceeded.
pub const DRAIN_MAX_CLUSTERS: usize = 1_000;

/// Extra token-splitting delimiters, folded into whitespace before the
/// final `split_whitespace` tokenization pass.
pub const DRAIN_DEFAULT_EXTRA_DELIMITERS: &str = "=,\"'[](){}|<>?!;&%$#@^*+~`";

// =============================================================================
// Statistics aggregator
// =============================================================================

/// Number of entries kept in the `/api/stats` top-sources and top-files
/// rankings.
pub const STATS_TOP_N: usize = 10;

// =============================================================================
// Anomaly detection
// =============================================================================

/// Default lookback window for an on-demand detection cycle.
pub const DEFAULT_DETECTION_WINDOW_HOURS: i64 = 24;

/// Default period between detection cycles in daemon mode (seconds),
/// matching the reference implementation's `--interval` default.
pub const DEFAULT_DETECTION_INTERVAL_SECS: u64 = 300;

/// Minimum configurable detection interval (seconds). Prevents a
/// misconfigured cycle from busy-looping against storage.
pub const MIN_DETECTION_INTERVAL_SECS: u64 = 10;

/// Maximum configurable detection interval (seconds).
pub const MAX_DETECTION_INTERVAL_SECS: u64 = 86_400;

/// Rolling window (in hourly buckets) the volume strategy computes its mean
/// and standard deviation over, capped at `N - 1` prior buckets.
pub const VOLUME_ROLLING_WINDOW_HOURS: i64 = 24;

/// Z-score magnitude beyond which a bucket is flagged as a volume anomaly.
pub const VOLUME_Z_SCORE_THRESHOLD: f64 = 3.0;

/// Z-score magnitude beyond which a volume anomaly is escalated to HIGH.
pub const VOLUME_Z_SCORE_HIGH_THRESHOLD: f64 = 5.0;

/// Small constant added to the standard deviation denominator in the
/// volume strategy's z-score to avoid division by zero on flat windows.
pub const VOLUME_Z_SCORE_EPSILON: f64 = 1e-9;

/// Minimum hourly error rate (fraction of error-like records) for the
/// error-rate strategy to consider a bucket anomalous.
pub const ERROR_RATE_MIN_THRESHOLD: f64 = 0.10;

/// Multiplier the current bucket's error rate must exceed relative to the
/// mean of earlier buckets.
pub const ERROR_RATE_SURGE_MULTIPLIER: f64 = 2.0;

/// Error rate above which a `HIGH_ERROR_RATE` anomaly is escalated to
/// CRITICAL rather than HIGH.
pub const ERROR_RATE_CRITICAL_THRESHOLD: f64 = 0.5;

/// New-template ratio above which a `NEW_TEMPLATE_SURGE` anomaly fires.
pub const NEW_TEMPLATE_SURGE_RATIO: f64 = 0.05;

/// New-template ratio above which the surge anomaly is escalated to HIGH.
pub const NEW_TEMPLATE_SURGE_HIGH_RATIO: f64 = 0.20;

/// Historical lookback window for computing each template's rarity
/// baseline (5th percentile of hourly counts).
pub const RARE_TEMPLATE_HISTORY_DAYS: i64 = 7;

/// Recent window scanned for reactivation of a rare template.
pub const RARE_TEMPLATE_RECENT_HOURS: i64 = 2;

/// Percentile (0.0-1.0) defining the "rare" threshold within the historical
/// window.
pub const RARE_TEMPLATE_PERCENTILE: f64 = 0.05;

/// Multiplier applied to the rare-template baseline a recent-window count
/// must exceed to be flagged as reactivation.
pub const RARE_TEMPLATE_REACTIVATION_MULTIPLIER: f64 = 3.0;

/// Minimum number of hourly feature vectors required before the statistical
/// outlier detector runs.
pub const ML_DETECTOR_MIN_VECTORS: usize = 24;

/// Expected fraction of outliers the statistical detector is tuned for,
/// matching the reference implementation's `contamination=0.1`.
pub const ML_DETECTOR_CONTAMINATION: f64 = 0.10;

/// Fixed seed for the statistical outlier detector, matching the reference
/// implementation's `random_state=42`. Recorded in each emitted anomaly's
/// `details.seed` for reproducibility.
pub const ML_DETECTOR_SEED: u64 = 42;

/// Outlier score magnitude above which an `ML_DETECTED_ANOMALY` is
/// escalated to HIGH.
pub const ML_DETECTOR_HIGH_SCORE_THRESHOLD: f64 = 0.5;

/// Recent window checked for zero activity by the source-silence strategy.
pub const SOURCE_SILENCE_RECENT_HOURS: i64 = 2;

/// Minimum mean hourly count over the earlier part of the window required
/// before a source's recent silence is considered anomalous.
pub const SOURCE_SILENCE_MIN_PRIOR_MEAN: f64 = 5.0;

// =============================================================================
// HTTP service
// =============================================================================

/// Default bind address for the HTTP listener.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Default page size for `/api/logs/query` when the caller omits `limit`.
pub const DEFAULT_QUERY_LIMIT: u64 = 100;

/// Hard upper bound on a single query page size.
pub const MAX_QUERY_LIMIT: u64 = 10_000;

/// Maximum accepted upload size in bytes for `/api/logs/upload`.
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024; // 500 MB

/// File extensions accepted by the upload endpoint.
pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["log", "txt", "json"];

/// Default `source` value for Fluent Bit records lacking both an explicit
/// `source` and a `tag` field.
pub const DEFAULT_FLUENT_BIT_SOURCE: &str = "fluent-bit";

/// Subdirectory of the platform data directory where uploaded files are
/// staged under their assigned `file_id`.
pub const UPLOADS_DIR_NAME: &str = "uploads";

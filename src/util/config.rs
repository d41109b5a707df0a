// LogSleuth - util/config.rs
//
// Layered service configuration (§10.3): named constants as the innermost
// default, an optional TOML file on top, environment variables on top of
// that, and CLI flags taking final precedence for the handful that make
// sense on a service binary.

use crate::platform::PlatformPaths;
use crate::util::constants::{
    DEFAULT_BIND_ADDR, DEFAULT_DETECTION_INTERVAL_SECS, MAX_DETECTION_INTERVAL_SECS, MIN_DETECTION_INTERVAL_SECS,
    STORAGE_DB_FILE_NAME,
};
use crate::util::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Resolved configuration for one run of the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub storage_url: String,
    pub detection_interval_secs: u64,
    pub debug: bool,
    pub daemon: bool,
}

/// On-disk TOML shape (§10.3). Every field optional; absent fields fall
/// through to the environment/default layers.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    bind_addr: Option<String>,
    storage_url: Option<String>,
    detection_interval_secs: Option<u64>,
}

/// CLI overrides, as parsed by `main`'s `clap` struct. `None` for a field
/// that was not passed on the command line.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub debug: bool,
    pub daemon: bool,
    pub interval: Option<u64>,
}

impl AppConfig {
    /// Resolve the final configuration: constants < TOML file < environment
    /// variables < CLI flags (§10.3).
    pub fn load(cli: CliOverrides) -> Result<Self, ConfigError> {
        let toml_config = match &cli.config_path {
            Some(path) => load_toml(path)?,
            None => TomlConfig::default(),
        };

        let bind_addr = cli
            .bind_addr
            .or_else(|| std::env::var("LOGSLEUTH_BIND_ADDR").ok())
            .or(toml_config.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let storage_url = std::env::var("LOGSLEUTH_STORAGE_URL")
            .ok()
            .or(toml_config.storage_url)
            .unwrap_or_else(default_storage_url);

        let detection_interval_secs = cli
            .interval
            .or_else(|| {
                std::env::var("LOGSLEUTH_DETECTION_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .or(toml_config.detection_interval_secs)
            .unwrap_or(DEFAULT_DETECTION_INTERVAL_SECS);

        if !(MIN_DETECTION_INTERVAL_SECS..=MAX_DETECTION_INTERVAL_SECS).contains(&detection_interval_secs) {
            return Err(ConfigError::ValueOutOfRange {
                field: "detection_interval_secs".to_string(),
                value: detection_interval_secs.to_string(),
                expected: format!("{MIN_DETECTION_INTERVAL_SECS}..={MAX_DETECTION_INTERVAL_SECS}"),
            });
        }

        Ok(Self {
            bind_addr,
            storage_url,
            detection_interval_secs,
            debug: cli.debug,
            daemon: cli.daemon,
        })
    }
}

fn load_toml(path: &Path) -> Result<TomlConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Default storage URL: an on-disk SQLite file under the platform data
/// directory, created if necessary.
fn default_storage_url() -> String {
    let paths = PlatformPaths::resolve();
    let _ = std::fs::create_dir_all(&paths.data_dir);
    let db_path = paths.data_dir.join(STORAGE_DB_FILE_NAME);
    format!("sqlite://{}?mode=rwc", db_path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_overridden() {
        std::env::remove_var("LOGSLEUTH_BIND_ADDR");
        std::env::remove_var("LOGSLEUTH_STORAGE_URL");
        std::env::remove_var("LOGSLEUTH_DETECTION_INTERVAL_SECS");
        let config = AppConfig::load(CliOverrides::default()).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.detection_interval_secs, DEFAULT_DETECTION_INTERVAL_SECS);
    }

    #[test]
    fn cli_flag_overrides_bind_addr() {
        let cli = CliOverrides {
            bind_addr: Some("0.0.0.0:9000".to_string()),
            ..Default::default()
        };
        let config = AppConfig::load(cli).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
    }

    #[test]
    fn out_of_range_interval_is_rejected() {
        let cli = CliOverrides {
            interval: Some(1),
            ..Default::default()
        };
        assert!(AppConfig::load(cli).is_err());
    }
}

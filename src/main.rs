// LogSleuth - main.rs
//
// Service entry point. Handles:
// 1. CLI argument parsing
// 2. Logging initialisation (debug mode support)
// 3. Configuration resolution (§10.3)
// 4. Storage/miner/state wiring and the axum HTTP listener
// 5. Optional continuous detection-cycle daemon (§11)

use logsleuth::app;
use logsleuth::core::miner::MinerConfig;
use logsleuth::core::miner_actor;
use logsleuth::http;
use logsleuth::storage::sqlite::SqliteStorage;
use logsleuth::util;
use logsleuth::util::config::{AppConfig, CliOverrides};

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// LogSleuth - log ingestion, template mining, and anomaly detection service.
#[derive(Parser, Debug)]
#[command(name = "LogSleuth", version, about)]
struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Address to bind the HTTP listener to (e.g. 0.0.0.0:8080).
    #[arg(short = 'b', long = "bind")]
    bind: Option<String>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Run the continuous detection-cycle daemon alongside the HTTP listener.
    #[arg(long = "daemon")]
    daemon: bool,

    /// Detection-cycle interval in seconds (only meaningful with --daemon).
    #[arg(long = "interval")]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    util::logging::init(cli.debug, None, None);

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        "LogSleuth starting"
    );

    let config = match AppConfig::load(CliOverrides {
        config_path: cli.config,
        bind_addr: cli.bind,
        debug: cli.debug,
        daemon: cli.daemon,
        interval: cli.interval,
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to resolve configuration");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let storage = match SqliteStorage::connect(&config.storage_url).await {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to storage");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let miner = miner_actor::spawn(MinerConfig::default());
    let bind_addr = config.bind_addr.clone();
    let daemon_enabled = config.daemon;
    let detection_interval = std::time::Duration::from_secs(config.detection_interval_secs);
    let state = app::state::AppState::new(miner, storage.clone() as Arc<dyn logsleuth::storage::StorageAdapter>, config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let daemon_handle = daemon_enabled.then(|| {
        let storage = storage.clone() as Arc<dyn logsleuth::storage::StorageAdapter>;
        tokio::spawn(app::daemon::run(storage, Some(detection_interval), shutdown_rx))
    });

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %bind_addr, "Failed to bind HTTP listener");
            eprintln!("Error: failed to bind {bind_addr}: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %bind_addr, daemon = daemon_enabled, "LogSleuth listening");

    let router = http::build_router(state);

    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = daemon_handle {
        let _ = handle.await;
    }

    if let Err(e) = serve_result {
        tracing::error!(error = %e, "HTTP server terminated with an error");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    tracing::info!("LogSleuth shut down cleanly");
}

/// Resolves once the process receives Ctrl+C, signalling graceful shutdown
/// to the HTTP listener and the detection daemon.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
    }
    tracing::info!("Shutdown signal received");
}

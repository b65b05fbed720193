//! Patient flow board - clinic status board server
//!
//! Reconstructs each patient's progress through the clinic from badge scans
//! and serves it over HTTP.
//!
//! Module structure:
//! - `domain/` - Core types (ScanEvent, ProgressRow, Pathway, StageCatalog)
//! - `services/` - Progress reconstruction engine
//! - `io/` - External interfaces (scan log, notifications, HTTP API)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use patient_flow_board::infra::{Config, Metrics};
use patient_flow_board::io::{start_board_server, BoardState, JsonlEventStore};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Patient flow board - clinic progress status board
#[derive(Parser, Debug)]
#[command(name = "flow-board", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "flow-board starting");

    let args = Args::parse();
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path);

    let pathways: Vec<&str> = config.catalog().pathways().iter().map(|p| p.code()).collect();
    info!(
        config_file = %config.config_file(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        event_file = %config.event_file(),
        fixed_date = ?config.fixed_date(),
        branches = %config.branches().len(),
        pathways = ?pathways,
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let store = Arc::new(JsonlEventStore::new(config.event_file()));
    let metrics = Arc::new(Metrics::new());
    let state = Arc::new(BoardState::new(config, store, metrics.clone()));

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    start_board_server(state, shutdown_rx).await?;

    metrics.snapshot().log();
    info!("flow-board shutdown complete");
    Ok(())
}

//! Flow Replay - offline progress reconstruction from a scan log
//!
//! Reads a JSONL scan log and prints the rows the board would show for one
//! patient, without starting the server.
//!
//! Usage:
//!   flow-replay --log data/scans.jsonl --branch kbj --pathway opr --id A001
//!   flow-replay --config config/dev.toml --pathway pol --id a001 --date 2021-04-18 --json

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::Parser;
use patient_flow_board::domain::ProgressRow;
use patient_flow_board::infra::Config;
use patient_flow_board::io::event_store::{EventSource, JsonlEventStore, ScanQuery};
use patient_flow_board::io::http::sanitize_queue_id;
use patient_flow_board::services::reconstruct;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Flow Replay - print a patient's reconstructed progress
#[derive(Parser, Debug)]
#[command(name = "flow-replay", version, about, long_about = None)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Scan log to read (defaults to event_store.file from config)
    #[arg(short, long)]
    log: Option<String>,

    /// Branch code
    #[arg(short, long, default_value = "kbj")]
    branch: String,

    /// Pathway code
    #[arg(short, long)]
    pathway: String,

    /// Queue number, e.g. A001
    #[arg(short, long)]
    id: String,

    /// Day to replay (defaults to event_store.fixed_date, then today)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Print rows as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn clock(t: Option<chrono::NaiveDateTime>) -> String {
    t.map(|t| t.format("%H:%M:%S").to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_table(rows: &[ProgressRow]) {
    println!("{:<3} {:<28} {:>8} {:>8}", "", "STAGE", "IN", "OUT");
    for row in rows {
        let marker = if row.active { ">>" } else { "" };
        println!(
            "{:<3} {:<28} {:>8} {:>8}",
            marker,
            row.display_name,
            clock(row.entry_time),
            clock(row.exit_time)
        );
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path);

    let branch = config
        .branch(&args.branch)
        .ok_or_else(|| anyhow!("unknown branch '{}'", args.branch))?;
    let pathway = config
        .catalog()
        .pathway(&args.pathway)
        .ok_or_else(|| anyhow!("unknown pathway '{}'", args.pathway))?;
    let id = sanitize_queue_id(&args.id)?;

    let log = args.log.as_deref().unwrap_or(config.event_file());
    let store = JsonlEventStore::new(log);
    let query = ScanQuery {
        branch_id: branch.id.clone(),
        patient_id: id.clone(),
        date: args.date.unwrap_or_else(|| config.query_date()),
    };
    let batch = store.scans(&query).with_context(|| format!("Failed to replay {log}"))?;

    let rows = reconstruct(&batch.events, pathway);
    info!(
        pathway = %pathway.code(),
        id = %id,
        scans = %batch.events.len(),
        skipped = %batch.skipped,
        rows = %rows.len(),
        "replay_complete"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        println!("Data pasien {id} untuk {} tidak tersedia", pathway.name());
    } else {
        print_table(&rows);
    }

    Ok(())
}

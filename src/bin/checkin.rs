//! Command-line front end for the check-in log.

use std::{
    io::{self, BufRead},
    path::PathBuf,
};

use anyhow::{Context, Result, bail};
use chrono::{Local, SecondsFormat};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use checkin::{
    config::CheckInConfig,
    core::projection::ListQuery,
    error::CheckInError,
    persist::sqlite::SqliteRecordStore,
    record::AttendeeRecord,
    runtime::handle::{CheckInHandle, ScanOutcome, spawn_checkin},
    sync::DisabledSync,
    types::{SortDirection, SortField, StoreMode},
};

/// Event check-in log
#[derive(Parser)]
#[command(name = "checkin")]
#[command(about = "Scan, list and export event check-ins", long_about = None)]
#[command(version)]
struct Cli {
    /// Database file (overrides CHECKIN_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check in an attendee typed by hand
    Add {
        /// Attendee identifier (NIK)
        #[arg(long)]
        id: String,
        /// Attendee name
        #[arg(long)]
        name: String,
    },

    /// Check in decoded QR payloads; `-` reads one payload per line from stdin
    Scan {
        payload: String,
    },

    /// List check-ins
    List {
        /// Case-insensitive search over name and identifier
        #[arg(short, long, default_value = "")]
        filter: String,
        #[arg(short, long, value_enum, default_value_t = SortArg::Time)]
        sort: SortArg,
        /// Ascending instead of descending
        #[arg(long)]
        asc: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete one check-in
    Delete {
        id: String,
    },

    /// Delete every check-in
    Clear {
        /// Required confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Write a dated CSV export
    Export {
        /// Output directory (overrides CHECKIN_EXPORT_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Submit check-ins to the sync endpoint
    Sync,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Time,
    Name,
    Id,
}

impl From<SortArg> for SortField {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Time => SortField::CheckedInAt,
            SortArg::Name => SortField::DisplayName,
            SortArg::Id => SortField::Identifier,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = CheckInConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }

    let db_path = config
        .resolve_db_path()
        .context("resolving database location")?;
    let export_dir = config.export_dir.clone();
    let handle = spawn_checkin(
        Box::new(SqliteRecordStore::new(&db_path)),
        Box::new(DisabledSync),
        config,
    );

    if handle.open().await? == StoreMode::InMemory {
        eprintln!("warning: {} could not be opened; nothing will be saved", db_path.display());
    }

    let result = run(&handle, cli.command, export_dir).await;
    handle.shutdown().await?;
    result
}

async fn run(handle: &CheckInHandle, command: Command, export_dir: Option<PathBuf>) -> Result<()> {
    match command {
        Command::Add { id, name } => {
            let rec = handle.check_in_manual(&id, &name).await.map_err(friendly)?;
            println!("checked in {} ({})", rec.display_name, rec.identifier);
        }
        Command::Scan { payload } => {
            if payload == "-" {
                for line in io::stdin().lock().lines() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    match handle.scan(line).await {
                        Ok(outcome) => report_scan(outcome),
                        Err(err) => eprintln!("{}", friendly(err)),
                    }
                }
            } else {
                report_scan(handle.scan(payload).await.map_err(friendly)?);
            }
        }
        Command::List { filter, sort, asc, json } => {
            let direction = if asc {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            let rows = handle
                .list(ListQuery::new(filter, sort.into(), direction))
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for rec in &rows {
                    print_row(rec);
                }
                println!("{} check-in(s)", rows.len());
            }
        }
        Command::Delete { id } => {
            handle.delete(id.clone()).await?;
            println!("deleted {id}");
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to delete every check-in without --yes");
            }
            handle.clear_all().await?;
            println!("all check-ins deleted");
        }
        Command::Export { dir } => {
            let dir = dir
                .or(export_dir)
                .unwrap_or_else(|| PathBuf::from("."));
            let path = handle.export_to(dir, Local::now().date_naive()).await?;
            println!("exported to {}", path.display());
        }
        Command::Sync => {
            let receipt = handle.sync().await?;
            if receipt.transmitted {
                println!("synced {} check-in(s)", receipt.offered);
            } else {
                println!("sync is not configured; {} check-in(s) kept locally", receipt.offered);
            }
        }
    }
    Ok(())
}

/// `RUST_LOG` when it parses, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn report_scan(outcome: ScanOutcome) {
    match outcome {
        ScanOutcome::Accepted(rec) => {
            println!("checked in {} ({})", rec.display_name, rec.identifier)
        }
        ScanOutcome::Suppressed => println!("scan ignored, too soon after the last one"),
    }
}

fn print_row(rec: &AttendeeRecord) {
    let at = rec
        .checked_in_at
        .with_timezone(&Local)
        .to_rfc3339_opts(SecondsFormat::Secs, false);
    println!("{}\t{}\t{}", rec.identifier, rec.display_name, at);
}

fn friendly(err: CheckInError) -> anyhow::Error {
    match err {
        CheckInError::DuplicateIdentifier(id) => anyhow::anyhow!("{id} is already checked in"),
        CheckInError::InvalidPayload(msg) => anyhow::anyhow!("not a valid attendee code: {msg}"),
        other => other.into(),
    }
}

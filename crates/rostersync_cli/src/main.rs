//! Rostersync CLI
//!
//! Command-line tools for syncing a roster workspace with its spreadsheet.
//!
//! # Commands
//!
//! - `init` - Write workspace settings
//! - `full-sync`, `backup`, `diff-sync`, `compound`, `page-sync` - Sync modes
//! - `push`, `delete` - Single-record operations
//! - `watch` - Run timed differential sync
//! - `ledger` - Show the deletion ledger
//! - `inspect` - Display workspace statistics

mod commands;
mod workspace;

use clap::{Parser, Subcommand};
use commands::sync::SyncMode;
use rostersync_model::{EntityKind, LocalId, Page};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use workspace::Workspace;

/// Roster spreadsheet sync tools.
#[derive(Parser)]
#[command(name = "rostersync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the workspace directory
    #[arg(global = true, short, long, default_value = ".")]
    dir: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write workspace settings
    Init {
        /// Spreadsheet id to sync with
        spreadsheet_id: String,

        /// Background sync interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,

        /// Overwrite existing settings
        #[arg(long)]
        force: bool,
    },

    /// Replace local data with the spreadsheet
    FullSync,

    /// Overwrite the spreadsheet with local data
    Backup,

    /// Merge spreadsheet changes into local data
    DiffSync,

    /// Pick backup, full sync or merge from row counts
    Compound,

    /// Refresh the kinds shown on two pages
    PageSync {
        /// Page navigated from
        #[arg(long)]
        from: Page,

        /// Page navigated to
        #[arg(long)]
        to: Page,
    },

    /// Upload one local record
    Push {
        /// Entity kind (guest, volunteer, job, job_type_config, venue)
        kind: EntityKind,

        /// Local id of the record
        local_id: u64,
    },

    /// Delete one record locally and remotely
    Delete {
        /// Entity kind (guest, volunteer, job, job_type_config, venue)
        kind: EntityKind,

        /// Local id of the record
        local_id: u64,
    },

    /// Show the deletion ledger
    Ledger {
        /// Drop expired entries first
        #[arg(short, long)]
        prune: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display workspace statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run timed differential sync
    Watch {
        /// Interval in seconds (defaults to the configured one)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many seconds
        #[arg(long, default_value = "3600")]
        duration: u64,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init {
            spreadsheet_id,
            interval,
            force,
        } => {
            commands::init::run(&cli.dir, &spreadsheet_id, interval, force)?;
        }
        Commands::FullSync => run_sync(&cli.dir, SyncMode::Full).await?,
        Commands::Backup => run_sync(&cli.dir, SyncMode::Backup).await?,
        Commands::DiffSync => run_sync(&cli.dir, SyncMode::Differential).await?,
        Commands::Compound => run_sync(&cli.dir, SyncMode::Compound).await?,
        Commands::PageSync { from, to } => {
            run_sync(&cli.dir, SyncMode::Page { from, to }).await?;
        }
        Commands::Push { kind, local_id } => {
            let workspace = Workspace::open(&cli.dir)?;
            commands::item::push(&workspace, kind, LocalId(local_id)).await?;
        }
        Commands::Delete { kind, local_id } => {
            let workspace = Workspace::open(&cli.dir)?;
            commands::item::delete(&workspace, kind, LocalId(local_id)).await?;
        }
        Commands::Ledger { prune, format } => {
            let workspace = Workspace::open(&cli.dir)?;
            commands::ledger::run(&workspace, prune, &format)?;
        }
        Commands::Inspect { format } => {
            let workspace = Workspace::open(&cli.dir)?;
            commands::inspect::run(&workspace, &format)?;
        }
        Commands::Watch { interval, duration } => {
            let workspace = Workspace::open(&cli.dir)?;
            commands::watch::run(
                &workspace,
                interval.map(Duration::from_secs),
                Duration::from_secs(duration),
            )
            .await?;
        }
        Commands::Version => {
            println!("Rostersync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

async fn run_sync(dir: &std::path::Path, mode: SyncMode) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::open(dir)?;
    commands::sync::run(&workspace, mode).await
}

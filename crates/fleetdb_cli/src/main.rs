//! FleetDB CLI
//!
//! Command-line tools for FleetDB data directories.
//!
//! # Commands
//!
//! - `inspect` - Display record counts and document sizes
//! - `verify` - Re-validate every stored record
//! - `migrate` - Backfill legacy documents
//! - `sweep` - Refresh insurance statuses, once or on a daily schedule

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// FleetDB command-line maintenance tools.
#[derive(Parser)]
#[command(name = "fleetdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display record counts and document sizes
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Re-validate every stored record against its schema and references
    Verify,

    /// Backfill legacy documents and persist the result
    Migrate {
        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Recompute insurance statuses
    Sweep {
        /// Remove policies that have expired
        #[arg(short, long)]
        evict: bool,

        /// Keep running and sweep once a day at this local time (HH:MM)
        #[arg(long, value_name = "HH:MM")]
        daily_at: Option<String>,

        /// Seconds between schedule checks
        #[arg(long, default_value = "60")]
        poll_secs: u64,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Data directory required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Data directory required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Migrate { dry_run } => {
            let path = cli.path.ok_or("Data directory required for migrate")?;
            commands::migrate::run(&path, dry_run)?;
        }
        Commands::Sweep {
            evict,
            daily_at,
            poll_secs,
        } => {
            let path = cli.path.ok_or("Data directory required for sweep")?;
            match daily_at {
                Some(at) => commands::sweep::run_daily(&path, evict, &at, poll_secs)?,
                None => commands::sweep::run_once(&path, evict)?,
            }
        }
        Commands::Version => {
            println!("FleetDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("FleetDB Core v{}", fleetdb_core::VERSION);
        }
    }

    Ok(())
}

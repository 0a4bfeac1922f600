//! # Tidemark CLI Module
//!
//! ## Available Commands
//!
//! - `trigger` - Resolve a trigger region for a target
//! - `scan` - Live reconciliation report for a stored region
//! - `estimate` - Estimated vs actual update offsets for a region
//! - `status` - Show store contents and derived statistics

mod commands;

use clap::{Parser, Subcommand};
use tidemark_core::TidemarkError;
use tracing::info;

use crate::net::NsClient;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Tidemark - update trigger timing tool
///
/// Estimates the real-time order in which regions update from a daily
/// world snapshot, and resolves trigger regions ahead of a target.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Your own nation, used to identify this tool's API traffic
    #[arg(short, long)]
    pub nation: String,

    /// Minimum milliseconds between API requests (floor 750)
    #[arg(short, long, default_value = "750")]
    pub poll_speed: u64,

    /// Snapshot dump file to use instead of the current day's
    #[arg(short, long, global = true)]
    pub dump: Option<String>,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a trigger region for a target
    Trigger {
        /// The target region
        #[arg(short, long)]
        target: String,

        /// Trigger width in seconds (defaults to one nation's average time)
        #[arg(short, long)]
        width: Option<f64>,

        /// Use minor-cycle timing instead of major
        #[arg(short, long)]
        minor: bool,
    },

    /// Live reconciliation report for a stored region
    Scan {
        /// The region to scan
        #[arg(short, long)]
        region: String,
    },

    /// Estimated vs actual update offsets for a region
    Estimate {
        /// The region to estimate
        #[arg(short, long)]
        region: String,

        /// Use minor-cycle timing instead of major
        #[arg(short, long)]
        minor: bool,
    },

    /// Show store contents and derived statistics
    Status,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TidemarkError> {
    let client = NsClient::new(&cli.nation, cli.poll_speed)?;

    info!(nation = %cli.nation, "verifying operator nation");
    client.verify_nation(&cli.nation).await?;

    let today = chrono::Local::now().date_naive();
    let dump_name = cli
        .dump
        .clone()
        .unwrap_or_else(|| crate::dump::default_dump_name(today));

    match cli.command {
        Commands::Trigger {
            target,
            width,
            minor,
        } => cmd_trigger(&client, &dump_name, today, &target, width, minor).await,
        Commands::Scan { region } => cmd_scan(&client, &dump_name, today, &region).await,
        Commands::Estimate { region, minor } => {
            cmd_estimate(&client, &dump_name, today, &region, minor).await
        }
        Commands::Status => cmd_status(&client, &dump_name, today).await,
    }
}

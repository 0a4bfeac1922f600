//! # Tidemark - Update Trigger Timing Tool
//!
//! The main binary for the tidemark update-order engine.
//!
//! This application provides:
//! - Snapshot ingestion (download, decompress, parse, store)
//! - Trigger resolution against the derived update order
//! - Live reconciliation reports for stored regions
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                 apps/tidemark (THE BINARY)                │
//! │                                                           │
//! │  ┌──────────┐   ┌─────────────┐   ┌───────────────────┐  │
//! │  │   CLI    │   │ API client  │   │  Dump pipeline    │  │
//! │  │  (clap)  │   │  (reqwest)  │   │ (flate2/quick-xml)│  │
//! │  └────┬─────┘   └──────┬──────┘   └─────────┬─────────┘  │
//! │       │                │                    │             │
//! │       └────────────────┼────────────────────┘             │
//! │                        ▼                                  │
//! │               ┌────────────────┐                          │
//! │               │ tidemark-core  │                          │
//! │               │  (THE LOGIC)   │                          │
//! │               └────────────────┘                          │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Resolve a trigger 30 seconds ahead of a target
//! tidemark -n my_nation trigger -t "Target Region" -w 30
//!
//! # Reconcile a stored region against live state
//! tidemark -n my_nation scan -r "Target Region"
//! ```

mod cli;
mod dump;
mod net;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing; TIDEMARK_LOG_FORMAT=json selects machine-parseable output.
    let log_format = std::env::var("TIDEMARK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tidemark=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the tidemark startup banner.
fn print_banner() {
    println!(
        r#"
  tidemark v{}
  update-order estimation and trigger resolution
"#,
        env!("CARGO_PKG_VERSION")
    );
}

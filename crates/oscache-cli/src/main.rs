//! os-calendar-cache CLI — entry point.
//!
//! # Commands
//!
//! - `oscache update` — refresh the XML notifications file from the ICAL feed
//! - `oscache status` — show the current outage state
//! - `oscache config {check,show,init}` — manage the configuration file

mod config_cmd;
mod helpers;
mod logging;
mod status;
mod update_cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};

use oscache_core::config::DebugLevel;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Cache an ICAL outage calendar as an XML notifications feed
#[derive(Parser)]
#[command(name = "oscache", version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: $OSCACHE_CONFIG or /etc/os_calendar_cache.conf)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the feed and refresh the notifications file
    Update {
        /// Override the configured level (NOTSET, DEBUG, INFO, WARNING, ERROR, CRITICAL)
        #[arg(short, long, value_parser = parse_debug_level)]
        debug_level: Option<DebugLevel>,

        /// Log to stdout
        #[arg(long, default_value_t = false)]
        console: bool,

        /// Log to the configured log file
        #[arg(long, default_value_t = false)]
        log_to_file: bool,
    },

    /// Fetch the feed and show the current outage state
    Status {
        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Include links and descriptions
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },

    /// Validate, print, or create the configuration file
    Config {
        #[command(subcommand)]
        action: config_cmd::ConfigCommands,
    },
}

fn parse_debug_level(s: &str) -> Result<DebugLevel, String> {
    s.parse()
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = helpers::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Update {
            debug_level,
            console,
            log_to_file,
        } => {
            update_cmd::run(
                &config_path,
                update_cmd::UpdateArgs {
                    debug_level,
                    console,
                    log_to_file,
                },
            )
            .await
        }
        Commands::Status { json, verbose } => status::run(&config_path, json, verbose).await,
        Commands::Config { action } => config_cmd::dispatch(&config_path, action),
    }
}

//! `oscache config` — validate, print, and create configuration files.
//!
//! - `oscache config check` — load and validate, print a summary
//! - `oscache config show` — print the normalized, documented file
//! - `oscache config init <PATH> [--force]` — write a documented default file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use oscache_core::config::{save_config, Config, OutageState};

use crate::helpers;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Load and validate the configuration
    Check,

    /// Print the normalized configuration with default annotations
    Show,

    /// Write a documented default configuration
    Init {
        /// Destination file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
}

/// Dispatch a config subcommand.
pub fn dispatch(config_path: &Path, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Check => check(config_path),
        ConfigCommands::Show => show(config_path),
        ConfigCommands::Init { path, force } => init(&path, force),
    }
}

/// `oscache config check`
fn check(config_path: &Path) -> Result<()> {
    let config = helpers::load(config_path)?;

    helpers::print_heading("Configuration");
    println!(
        "  {} {} is valid",
        "✓".green(),
        config_path.display()
    );
    println!();
    for line in summary(&config) {
        println!("  {line}");
    }
    println!();
    Ok(())
}

/// `oscache config show`
fn show(config_path: &Path) -> Result<()> {
    let config = helpers::load(config_path)?;
    print!("{}", config.to_ini_string());
    Ok(())
}

/// `oscache config init <PATH> [--force]`
fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    save_config(&Config::default(), path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("  {} created config at {}", "✓".green(), path.display());
    Ok(())
}

/// One line per setting, in file order.
fn summary(config: &Config) -> Vec<String> {
    let files = &config.working_files;
    let mut lines = vec![
        format!("{:<18} {}", "debug_level", config.debugging.debug_level),
        format!("{:<18} {}", "log_file", config.debugging.log_file.display()),
        format!("{:<18} {}", "resolved_pattern", config.parsing.resolved_pattern),
        format!("{:<18} {}s", "scope_ahead", config.parsing.scope_ahead),
        format!("{:<18} {}s", "scope_past", config.parsing.scope_past),
        format!("{:<18} {}", "feed_url", config.sources.feed_url),
        format!("{:<18} {}", "website_url", config.sources.website_url),
        format!("{:<18} {}s", "url_timeout", config.sources.url_timeout),
        format!("{:<18} {}", "cache", files.cache_path().display()),
        format!("{:<18} {}", "notifications", files.notifications_path().display()),
        format!("{:<18} {}", "preserve_versions", files.preserve_versions),
    ];
    for state in OutageState::ALL {
        lines.push(format!(
            "{:<18} {}",
            format!("state.{}", state.as_str()),
            config.states.style(state)
        ));
    }
    lines
}

//! Shared CLI helpers — path expansion, config loading, banners.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use oscache_core::config::{get_config_path, load_config, Config};

use crate::logging;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Config path from `--config`, falling back to `$OSCACHE_CONFIG` and the
/// system default.
pub fn resolve_config_path(arg: Option<&str>) -> PathBuf {
    arg.map(expand_tilde).unwrap_or_else(get_config_path)
}

/// Load the config; warnings raised while validating go to stderr.
pub fn load(path: &Path) -> Result<Config> {
    tracing::dispatcher::with_default(&logging::bootstrap_dispatch(), || load_config(Some(path)))
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

/// Print a section heading.
pub fn print_heading(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

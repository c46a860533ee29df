//! `oscache update` — refresh the XML notifications file from the feed.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info};

use oscache_core::config::DebugLevel;
use oscache_feed::FeedCache;

use crate::helpers;
use crate::logging;

/// Options from the command line.
pub struct UpdateArgs {
    pub debug_level: Option<DebugLevel>,
    pub console: bool,
    pub log_to_file: bool,
}

/// Run the update command.
pub async fn run(config_path: &Path, args: UpdateArgs) -> Result<()> {
    let config = helpers::load(config_path)?;

    let (level, handlers) = logging::resolve_handlers(
        args.debug_level,
        config.debugging.debug_level,
        args.console,
        args.log_to_file,
    )?;
    logging::init(level, handlers, &config.debugging.log_file)?;

    info!(config = %config_path.display(), "starting cache update");
    let cache = FeedCache::from_config(&config).context("failed to set up feed cache")?;

    match cache.update().await {
        Ok(report) => {
            info!(
                updated = report.updated,
                outages = report.outages.len(),
                path = %report.notifications_path.display(),
                "cache update finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "cache update failed");
            Err(e).context("cache update failed")
        }
    }
}

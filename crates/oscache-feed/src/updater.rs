//! Cache updater — refreshes the XML notifications file from the feed.
//!
//! Every run downloads into a time-stamped copy of the cache file and renders
//! a time-stamped candidate XML next to it. The candidate only replaces the
//! notifications file when its bytes differ, so clients polling the file see
//! a new modification time only when an outage actually changed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use oscache_core::config::Config;
use oscache_core::utils::{file_stamp, versioned_name};

use crate::error::FeedError;
use crate::file_source::source_for_url;
use crate::outage::{Outage, OutageParser};
use crate::traits::FeedSource;
use crate::xml;

/// Outcome of one update run.
#[derive(Debug)]
pub struct UpdateReport {
    /// The notifications file was replaced.
    pub updated: bool,
    /// Outages parsed from the feed, in feed order.
    pub outages: Vec<Outage>,
    pub notifications_path: PathBuf,
}

/// Keeps the notifications file in sync with the feed.
pub struct FeedCache {
    source: Box<dyn FeedSource>,
    parser: OutageParser,
    working_directory: PathBuf,
    cache_name: String,
    notifications_name: String,
    preserve_versions: bool,
}

impl FeedCache {
    pub fn new(
        source: Box<dyn FeedSource>,
        parser: OutageParser,
        working_directory: impl Into<PathBuf>,
        cache_name: impl Into<String>,
        notifications_name: impl Into<String>,
        preserve_versions: bool,
    ) -> Self {
        Self {
            source,
            parser,
            working_directory: working_directory.into(),
            cache_name: cache_name.into(),
            notifications_name: notifications_name.into(),
            preserve_versions,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, FeedError> {
        let source = source_for_url(&config.sources.feed_url, config.sources.url_timeout)?;
        let parser = OutageParser::from_config(&config.parsing)?;
        let files = &config.working_files;
        Ok(Self::new(
            source,
            parser,
            &files.working_directory,
            &files.cache,
            &files.notifications,
            files.preserve_versions,
        ))
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.working_directory.join(&self.notifications_name)
    }

    pub async fn update(&self) -> Result<UpdateReport, FeedError> {
        self.update_at(Local::now()).await
    }

    /// Run one update, stamping versioned files with `now`.
    pub async fn update_at(&self, now: DateTime<Local>) -> Result<UpdateReport, FeedError> {
        let (cache_path, candidate_path) = self.versioned_paths(&now);
        let notifications_path = self.notifications_path();

        tokio::fs::create_dir_all(&self.working_directory)
            .await
            .map_err(|e| FeedError::io(&self.working_directory, e))?;

        info!(source = %self.source.location(), "fetching outage feed");
        let body = self.source.fetch().await?;
        tokio::fs::write(&cache_path, &body)
            .await
            .map_err(|e| FeedError::io(&cache_path, e))?;
        debug!(path = %cache_path.display(), bytes = body.len(), "wrote feed cache");

        let published = self
            .publish(&body, &candidate_path, &notifications_path)
            .await;
        self.discard(&cache_path).await;
        let (updated, outages) = published?;

        Ok(UpdateReport {
            updated,
            outages,
            notifications_path,
        })
    }

    /// Parse the downloaded feed and swap in the rendered XML if it changed.
    async fn publish(
        &self,
        body: &[u8],
        candidate_path: &Path,
        notifications_path: &Path,
    ) -> Result<(bool, Vec<Outage>), FeedError> {
        let outages = self.parser.parse_feed(&String::from_utf8_lossy(body))?;
        let rendered = xml::render(&outages);

        let replaced = self
            .replace_if_changed(&rendered, candidate_path, notifications_path)
            .await;
        if replaced.is_err() {
            self.discard(candidate_path).await;
        }
        let updated = replaced?;

        if updated {
            info!(path = %notifications_path.display(), outages = outages.len(), "notifications updated");
        } else {
            info!(path = %notifications_path.display(), "notifications unchanged");
        }
        Ok((updated, outages))
    }

    async fn replace_if_changed(
        &self,
        rendered: &str,
        candidate_path: &Path,
        notifications_path: &Path,
    ) -> Result<bool, FeedError> {
        tokio::fs::write(candidate_path, rendered.as_bytes())
            .await
            .map_err(|e| FeedError::io(candidate_path, e))?;
        debug!(path = %candidate_path.display(), "wrote candidate notifications");

        let updated = match tokio::fs::read(notifications_path).await {
            Ok(current) => current != rendered.as_bytes(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %notifications_path.display(), "no notifications file yet; forcing update");
                true
            }
            Err(e) => return Err(FeedError::io(notifications_path, e)),
        };

        if !updated {
            self.discard(candidate_path).await;
            return Ok(false);
        }

        tokio::fs::rename(candidate_path, notifications_path)
            .await
            .map_err(|e| FeedError::io(notifications_path, e))?;
        if self.preserve_versions {
            // The rename consumed the candidate; keep a versioned copy too.
            if let Err(e) = tokio::fs::write(candidate_path, rendered.as_bytes()).await {
                error!(path = %candidate_path.display(), error = %e, "could not preserve notifications version");
            }
        }
        Ok(true)
    }

    /// Versioned cache and candidate paths for this run.
    fn versioned_paths(&self, now: &DateTime<Local>) -> (PathBuf, PathBuf) {
        let stamp = file_stamp(now);
        let cache = versioned_name(&self.cache_name, &stamp, None);
        let mut candidate = versioned_name(&self.notifications_name, &stamp, Some("xml"));
        if candidate == cache {
            candidate = versioned_name(
                &self.notifications_name,
                &format!("{stamp}-candidate"),
                Some("xml"),
            );
        }
        (
            self.working_directory.join(cache),
            self.working_directory.join(candidate),
        )
    }

    /// Remove a working file unless versions are preserved.
    async fn discard(&self, path: &Path) {
        if self.preserve_versions {
            return;
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "removed working file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!(path = %path.display(), error = %e, "could not remove working file"),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

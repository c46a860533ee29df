//! Local feed source for `file://` URLs, and URL → source selection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FeedError;
use crate::http_source::HttpFeedSource;
use crate::traits::FeedSource;

/// Reads a feed from the local filesystem.
#[derive(Debug)]
pub struct FileFeedSource {
    path: PathBuf,
    location: String,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let location = path.display().to_string();
        Self { path, location }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FeedSource for FileFeedSource {
    async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
        debug!(path = %self.path.display(), "reading feed from file");
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| FeedError::io(&self.path, e))
    }

    fn location(&self) -> &str {
        &self.location
    }
}

/// Build the source matching the scheme of `url`.
///
/// A `timeout_secs` of 0 disables the HTTP timeout.
pub fn source_for_url(url: &str, timeout_secs: u64) -> Result<Box<dyn FeedSource>, FeedError> {
    if url.starts_with("file:") {
        let invalid = |reason: String| FeedError::InvalidUrl {
            url: url.to_string(),
            reason,
        };
        let parsed = reqwest::Url::parse(url).map_err(|e| invalid(e.to_string()))?;
        let path = parsed
            .to_file_path()
            .map_err(|()| invalid("file URLs must name an absolute local path".into()))?;
        return Ok(Box::new(FileFeedSource::new(path)));
    }

    let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
    Ok(Box::new(HttpFeedSource::new(url, timeout)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_source_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.ics");
        std::fs::write(&path, "BEGIN:VCALENDAR\nEND:VCALENDAR\n").unwrap();

        let source = FileFeedSource::new(&path);
        let body = source.fetch().await.unwrap();
        assert!(body.starts_with(b"BEGIN:VCALENDAR"));
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileFeedSource::new("/nonexistent/feed.ics");
        assert!(matches!(
            source.fetch().await.unwrap_err(),
            FeedError::Io { .. }
        ));
    }

    #[test]
    fn test_source_for_file_url() {
        let source = source_for_url("file:///var/cache/feed.ics", 10).unwrap();
        assert_eq!(source.location(), "/var/cache/feed.ics");
    }

    #[test]
    fn test_source_for_file_url_with_localhost() {
        let source = source_for_url("file://localhost/var/cache/feed.ics", 10).unwrap();
        assert_eq!(source.location(), "/var/cache/feed.ics");
    }

    #[test]
    fn test_source_for_file_url_decodes_escapes() {
        let source = source_for_url("file:///srv/status%20feeds/outages%2Bmail.ics", 10).unwrap();
        assert_eq!(source.location(), "/srv/status feeds/outages+mail.ics");
    }

    #[tokio::test]
    async fn test_source_for_file_url_reads_escaped_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outage feed.ics");
        std::fs::write(&path, "BEGIN:VCALENDAR\nEND:VCALENDAR\n").unwrap();

        let url = format!("file://{}", dir.path().join("outage%20feed.ics").display());
        let body = source_for_url(&url, 0).unwrap().fetch().await.unwrap();
        assert!(body.starts_with(b"BEGIN:VCALENDAR"));
    }

    #[test]
    fn test_source_for_relative_file_url_rejected() {
        assert!(source_for_url("file://feed.ics", 10).is_err());
    }

    #[test]
    fn test_source_for_http_url() {
        let source = source_for_url("https://example.edu/feed.ics", 0).unwrap();
        assert_eq!(source.location(), "https://example.edu/feed.ics");
    }

    #[test]
    fn test_source_for_unknown_scheme() {
        assert!(matches!(
            source_for_url("gopher://example.edu/feed", 10),
            Err(FeedError::InvalidUrl { .. })
        ));
    }
}

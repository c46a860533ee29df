//! Feed source trait — where the raw ICAL bytes come from.
//!
//! `HttpFeedSource` covers `http://` and `https://` feed URLs,
//! `FileFeedSource` covers `file://` URLs; [`source_for_url`](crate::source_for_url)
//! picks one from the configured `feed_url`.

use async_trait::async_trait;

use crate::error::FeedError;

/// Trait that all feed sources implement.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the complete feed body.
    async fn fetch(&self) -> Result<Vec<u8>, FeedError>;

    /// Human-readable location for logging (URL or path).
    fn location(&self) -> &str;
}

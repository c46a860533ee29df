//! HTTP feed source — downloads the calendar export with `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FeedError;
use crate::traits::FeedSource;

/// User-Agent header.
const USER_AGENT: &str = concat!("os-calendar-cache/", env!("CARGO_PKG_VERSION"));

/// Maximum redirects followed before giving up.
const MAX_REDIRECTS: usize = 5;

// ─────────────────────────────────────────────
// HttpFeedSource
// ─────────────────────────────────────────────

/// Fetches a feed over HTTP(S).
pub struct HttpFeedSource {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    url: String,
}

impl std::fmt::Debug for HttpFeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFeedSource")
            .field("url", &self.url)
            .finish()
    }
}

impl HttpFeedSource {
    /// Create a source for `url`.
    ///
    /// `timeout` bounds both connecting and the whole request; `None` (from a
    /// configured `url_timeout` of 0) waits indefinitely.
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self, FeedError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FeedError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FeedError::InvalidUrl {
                url: url.to_string(),
                reason: "must use http or https".into(),
            });
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));
        if let Some(timeout) = timeout {
            builder = builder.connect_timeout(timeout).timeout(timeout);
        }
        let client = builder.build().map_err(|source| FeedError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok(HttpFeedSource {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
        debug!(url = %self.url, "downloading feed");

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| FeedError::Http {
                url: self.url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|source| FeedError::Http {
            url: self.url.clone(),
            source,
        })?;

        debug!(url = %self.url, bytes = body.len(), "feed downloaded");
        Ok(body.to_vec())
    }

    fn location(&self) -> &str {
        &self.url
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";

    // ── Unit tests ──

    #[test]
    fn test_rejects_unparseable_url() {
        let err = HttpFeedSource::new("not a url", None).unwrap_err();
        assert!(matches!(err, FeedError::InvalidUrl { .. }));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = HttpFeedSource::new("ftp://example.edu/feed.ics", None).unwrap_err();
        assert!(matches!(err, FeedError::InvalidUrl { .. }));
    }

    #[test]
    fn test_location_is_url() {
        let source = HttpFeedSource::new("https://example.edu/feed.ics", None).unwrap();
        assert_eq!(source.location(), "https://example.edu/feed.ics");
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendar/export.ics"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/calendar/export.ics", mock_server.uri());
        let source = HttpFeedSource::new(&url, Some(Duration::from_secs(5))).unwrap();
        let body = source.fetch().await.unwrap();
        assert_eq!(body, FEED.as_bytes());
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendar/export.ics"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = format!("{}/calendar/export.ics", mock_server.uri());
        let source = HttpFeedSource::new(&url, Some(Duration::from_secs(5))).unwrap();
        match source.fetch().await.unwrap_err() {
            FeedError::Status { status, .. } => assert_eq!(status, 404),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(FEED)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let url = format!("{}/slow.ics", mock_server.uri());
        let source = HttpFeedSource::new(&url, Some(Duration::from_millis(200))).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, FeedError::Http { .. }));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Port 9 (discard) is essentially never listening on test hosts.
        let source =
            HttpFeedSource::new("http://127.0.0.1:9/feed.ics", Some(Duration::from_secs(2)))
                .unwrap();
        assert!(matches!(
            source.fetch().await.unwrap_err(),
            FeedError::Http { .. }
        ));
    }
}

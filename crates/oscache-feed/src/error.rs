//! Error types for fetching and parsing outage feeds.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while turning an iCalendar document into components.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IcalError {
    /// The text has no `VCALENDAR` root.
    #[error("feed is not an iCalendar document (no BEGIN:VCALENDAR)")]
    NotCalendar,

    /// A content line or the BEGIN/END structure is broken.
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    /// A DATE or DATE-TIME value could not be read.
    #[error("invalid date-time value {0:?}")]
    DateTime(String),
}

/// Failure while fetching, parsing, or caching a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse ICAL feed: {0}")]
    Ical(#[from] IcalError),

    #[error("invalid resolved pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl FeedError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FeedError::Io {
            path: path.into(),
            source,
        }
    }
}

//! Outage feed layer for os-calendar-cache.
//!
//! # Architecture
//!
//! - [`traits::FeedSource`] — trait that every feed source implements
//! - [`http_source::HttpFeedSource`] / [`file_source::FileFeedSource`] — HTTP(S) and `file://` sources
//! - [`ical`] — minimal iCalendar reader
//! - [`outage::OutageParser`] — calendar events → [`outage::Outage`] records
//! - [`xml`] — notifications document writer
//! - [`updater::FeedCache`] — keeps the notifications file in sync with the feed
//! - [`state`] — classifies in-scope outages for clients

pub mod error;
pub mod file_source;
pub mod http_source;
pub mod ical;
pub mod outage;
pub mod state;
pub mod traits;
pub mod updater;
pub mod xml;

// Re-export main types for convenience
pub use error::{FeedError, IcalError};
pub use file_source::{source_for_url, FileFeedSource};
pub use http_source::HttpFeedSource;
pub use outage::{Outage, OutageParser};
pub use state::{check_feed, classify, ClassifiedOutage, FeedStatus, Scope};
pub use traits::FeedSource;
pub use updater::{FeedCache, UpdateReport};

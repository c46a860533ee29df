//! Outage extraction — turns calendar events into outage records.

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use oscache_core::config::schema::ParsingConfig;

use crate::error::IcalError;
use crate::ical::{self, Component};

/// One outage announced on the calendar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Outage {
    /// Event summary with punctuation replaced by `_`.
    pub title: String,
    /// Link to the calendar entry (empty when the event has none).
    pub link: String,
    pub description: String,
    /// The resolved pattern was found in the description.
    pub resolved: bool,
    /// Unix seconds.
    pub start_time: i64,
    /// Unix seconds; `None` when the event has no distinct end.
    pub end_time: Option<i64>,
    /// Unix seconds of the last modification.
    pub mod_time: i64,
}

impl Outage {
    /// End if known, otherwise start.
    pub fn effective_end(&self) -> i64 {
        self.end_time.unwrap_or(self.start_time)
    }
}

/// Extracts outages from ICAL text.
#[derive(Clone, Debug)]
pub struct OutageParser {
    resolved: Regex,
}

impl OutageParser {
    /// `resolved_pattern` is a regular expression searched in multi-line mode.
    pub fn new(resolved_pattern: &str) -> Result<Self, regex::Error> {
        let resolved = regex::RegexBuilder::new(resolved_pattern)
            .multi_line(true)
            .build()?;
        debug!(pattern = %resolved_pattern, "compiled resolved pattern");
        Ok(Self { resolved })
    }

    pub fn from_config(parsing: &ParsingConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            resolved: parsing.resolved_regex()?,
        })
    }

    /// Whether the description marks the outage as resolved.
    pub fn is_resolved(&self, description: &str) -> bool {
        let matched = self.resolved.is_match(description);
        debug!(matched, "resolved pattern search");
        matched
    }

    /// Parse every `VEVENT` in the feed.
    ///
    /// Events without a readable `DTSTART` are skipped with a warning; the
    /// rest of the feed is still used.
    pub fn parse_feed(&self, text: &str) -> Result<Vec<Outage>, IcalError> {
        let calendar = ical::parse_calendar(text)?;

        let outages: Vec<Outage> = calendar
            .events()
            .into_iter()
            .enumerate()
            .filter_map(|(i, event)| self.parse_event(event, i + 1))
            .collect();

        info!(count = outages.len(), "parsed outage event(s)");
        Ok(outages)
    }

    fn parse_event(&self, event: &Component, number: usize) -> Option<Outage> {
        debug!(event = number, "begin parsing event");

        let start_time = match event.property("DTSTART").map(|p| p.timestamp()) {
            Some(Ok(ts)) => ts,
            Some(Err(e)) => {
                warn!(event = number, error = %e, "skipping event with unreadable DTSTART");
                return None;
            }
            None => {
                warn!(event = number, "skipping event without DTSTART");
                return None;
            }
        };

        let end_time = match event.property("DTEND").map(|p| p.timestamp()) {
            Some(Ok(ts)) if ts != start_time => Some(ts),
            Some(Ok(_)) => {
                debug!(event = number, "found matching start and end time");
                None
            }
            Some(Err(e)) => {
                warn!(event = number, error = %e, "ignoring unreadable DTEND");
                None
            }
            None => None,
        };

        let mod_time = ["LAST-MODIFIED", "DTSTAMP"]
            .iter()
            .filter_map(|name| event.property(name))
            .find_map(|p| p.timestamp().ok())
            .unwrap_or(start_time);

        let description = event
            .property("DESCRIPTION")
            .map(|p| p.text())
            .unwrap_or_default();
        let summary = event
            .property("SUMMARY")
            .map(|p| p.text())
            .unwrap_or_default();
        let link = event
            .property("URL")
            .map(|p| p.value.trim().to_string())
            .unwrap_or_default();

        let title = sanitize_title(&summary);
        let resolved = self.is_resolved(&description);

        debug!(
            event = number,
            title = %title,
            link = %link,
            resolved,
            start_time,
            end_time = ?end_time,
            mod_time,
            "done parsing event"
        );

        Some(Outage {
            title,
            link,
            description,
            resolved,
            start_time,
            end_time,
            mod_time,
        })
    }
}

/// Replace every character that is not a word character or whitespace with `_`.
pub fn sanitize_title(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

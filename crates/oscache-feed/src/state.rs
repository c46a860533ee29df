//! Outage state classification.
//!
//! Each outage inside the display window gets one of `active`, `scheduled`,
//! `completed`, or `default`. The feed as a whole takes the most urgent state
//! present, `none` when the window is empty, or `error` when the feed could
//! not be read.

use tracing::{info, warn};

use oscache_core::config::schema::{OutageState, ParsingConfig};

use crate::outage::{Outage, OutageParser};
use crate::traits::FeedSource;

/// Display window around "now", in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scope {
    pub past: i64,
    pub ahead: i64,
}

impl Scope {
    pub fn new(past: u64, ahead: u64) -> Self {
        Self {
            past: i64::try_from(past).unwrap_or(i64::MAX),
            ahead: i64::try_from(ahead).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(parsing: &ParsingConfig) -> Self {
        Self::new(parsing.scope_past, parsing.scope_ahead)
    }

    /// Overlap test between the outage and `[now - past, now + ahead]`.
    pub fn contains(&self, outage: &Outage, now: i64) -> bool {
        outage.start_time <= now.saturating_add(self.ahead)
            && outage.effective_end() >= now.saturating_sub(self.past)
    }
}

/// State of a single outage at `now`.
pub fn outage_state(outage: &Outage, now: i64) -> OutageState {
    if outage.resolved {
        OutageState::Completed
    } else if outage.start_time > now {
        OutageState::Scheduled
    } else if outage.end_time.map_or(true, |end| end >= now) {
        OutageState::Active
    } else {
        OutageState::Default
    }
}

/// Rank used to pick the feed state; higher wins.
fn urgency_rank(state: OutageState) -> u8 {
    match state {
        OutageState::Error => 6,
        OutageState::Active => 5,
        OutageState::Scheduled => 4,
        OutageState::Default => 3,
        OutageState::Completed => 2,
        OutageState::None => 1,
    }
}

/// An in-scope outage with its state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedOutage {
    pub outage: Outage,
    pub state: OutageState,
}

/// Result of checking a feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedStatus {
    pub state: OutageState,
    /// In-scope outages, ordered by start time.
    pub outages: Vec<ClassifiedOutage>,
    /// Why the feed is in the `error` state.
    pub error: Option<String>,
}

impl FeedStatus {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: OutageState::Error,
            outages: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Classify the outages that fall inside `scope`.
pub fn classify(outages: &[Outage], now: i64, scope: Scope) -> FeedStatus {
    let mut classified: Vec<ClassifiedOutage> = outages
        .iter()
        .filter(|o| scope.contains(o, now))
        .map(|o| ClassifiedOutage {
            outage: o.clone(),
            state: outage_state(o, now),
        })
        .collect();
    classified.sort_by_key(|c| c.outage.start_time);

    let state = classified
        .iter()
        .map(|c| c.state)
        .max_by_key(|s| urgency_rank(*s))
        .unwrap_or(OutageState::None);

    FeedStatus {
        state,
        outages: classified,
        error: None,
    }
}

/// Fetch, parse, and classify. Failures become the `error` state.
pub async fn check_feed(
    source: &dyn FeedSource,
    parser: &OutageParser,
    now: i64,
    scope: Scope,
) -> FeedStatus {
    let body = match source.fetch().await {
        Ok(body) => body,
        Err(e) => {
            warn!(source = %source.location(), error = %e, "could not fetch outage feed");
            return FeedStatus::error(e.to_string());
        }
    };

    let text = String::from_utf8_lossy(&body);
    match parser.parse_feed(&text) {
        Ok(outages) => {
            let status = classify(&outages, now, scope);
            info!(
                state = %status.state,
                in_scope = status.outages.len(),
                total = outages.len(),
                "classified outage feed"
            );
            status
        }
        Err(e) => {
            warn!(source = %source.location(), error = %e, "could not parse outage feed");
            FeedStatus::error(format!("failed to parse ICAL feed: {e}"))
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_source::FileFeedSource;

    const NOW: i64 = 1_400_000_000;
    const HOUR: i64 = 3600;
    const DAY: i64 = 24 * HOUR;

    fn outage(start: i64, end: Option<i64>, resolved: bool) -> Outage {
        Outage {
            title: format!("outage at {start}"),
            link: String::new(),
            description: String::new(),
            resolved,
            start_time: start,
            end_time: end,
            mod_time: start,
        }
    }

    fn scope() -> Scope {
        Scope::new(DAY as u64, 7 * DAY as u64)
    }

    #[test]
    fn test_outage_state_active() {
        assert_eq!(
            outage_state(&outage(NOW - HOUR, Some(NOW + HOUR), false), NOW),
            OutageState::Active
        );
        assert_eq!(
            outage_state(&outage(NOW - HOUR, None, false), NOW),
            OutageState::Active
        );
    }

    #[test]
    fn test_outage_state_scheduled() {
        assert_eq!(
            outage_state(&outage(NOW + HOUR, Some(NOW + 2 * HOUR), false), NOW),
            OutageState::Scheduled
        );
    }

    #[test]
    fn test_outage_state_completed_when_resolved() {
        assert_eq!(
            outage_state(&outage(NOW - HOUR, Some(NOW + HOUR), true), NOW),
            OutageState::Completed
        );
        assert_eq!(
            outage_state(&outage(NOW + HOUR, None, true), NOW),
            OutageState::Completed
        );
    }

    #[test]
    fn test_outage_state_default_when_ended_unresolved() {
        assert_eq!(
            outage_state(&outage(NOW - 2 * HOUR, Some(NOW - HOUR), false), NOW),
            OutageState::Default
        );
    }

    #[test]
    fn test_scope_contains() {
        let s = scope();
        assert!(s.contains(&outage(NOW + 7 * DAY, None, false), NOW));
        assert!(!s.contains(&outage(NOW + 7 * DAY + 1, None, false), NOW));
        assert!(s.contains(&outage(NOW - 3 * DAY, Some(NOW - DAY), false), NOW));
        assert!(!s.contains(&outage(NOW - 3 * DAY, Some(NOW - DAY - 1), false), NOW));
        assert!(!s.contains(&outage(NOW - DAY - 1, None, false), NOW));
    }

    #[test]
    fn test_scope_saturates() {
        let s = Scope::new(u64::MAX, u64::MAX);
        assert!(s.contains(&outage(0, None, false), NOW));
        assert!(s.contains(&outage(i64::MAX - 1, None, false), NOW));
    }

    #[test]
    fn test_classify_none_when_empty_window() {
        let status = classify(&[outage(NOW - 30 * DAY, None, true)], NOW, scope());
        assert_eq!(status.state, OutageState::None);
        assert!(status.outages.is_empty());
    }

    #[test]
    fn test_classify_picks_most_urgent() {
        let outages = vec![
            outage(NOW + DAY, None, false),
            outage(NOW - HOUR, Some(NOW - 1), true),
            outage(NOW - HOUR, None, false),
        ];
        let status = classify(&outages, NOW, scope());
        assert_eq!(status.state, OutageState::Active);
        assert_eq!(status.outages.len(), 3);
        assert!(status.outages.windows(2).all(|w| {
            w[0].outage.start_time <= w[1].outage.start_time
        }));
    }

    #[test]
    fn test_classify_scheduled_beats_completed() {
        let outages = vec![
            outage(NOW - HOUR, Some(NOW - 1), true),
            outage(NOW + HOUR, None, false),
        ];
        assert_eq!(classify(&outages, NOW, scope()).state, OutageState::Scheduled);
    }

    #[test]
    fn test_classify_completed_only() {
        let outages = vec![outage(NOW - HOUR, Some(NOW - 1), true)];
        assert_eq!(classify(&outages, NOW, scope()).state, OutageState::Completed);
    }

    #[tokio::test]
    async fn test_check_feed_fetch_error() {
        let source = FileFeedSource::new("/nonexistent/feed.ics");
        let parser = OutageParser::new("Resolved:").unwrap();
        let status = check_feed(&source, &parser, NOW, scope()).await;
        assert_eq!(status.state, OutageState::Error);
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn test_check_feed_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.ics");
        std::fs::write(&path, "<html>maintenance</html>").unwrap();

        let source = FileFeedSource::new(&path);
        let parser = OutageParser::new("Resolved:").unwrap();
        let status = check_feed(&source, &parser, NOW, scope()).await;
        assert_eq!(status.state, OutageState::Error);
    }

    #[tokio::test]
    async fn test_check_feed_classifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.ics");
        // NOW = 2014-05-13T16:53:20Z
        std::fs::write(
            &path,
            "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\nSUMMARY:Upcoming\r\nDTSTART:20140514T090000Z\r\nEND:VEVENT\r\n\
END:VCALENDAR\r\n",
        )
        .unwrap();

        let source = FileFeedSource::new(&path);
        let parser = OutageParser::new("Resolved:").unwrap();
        let status = check_feed(&source, &parser, NOW, scope()).await;
        assert_eq!(status.state, OutageState::Scheduled);
        assert_eq!(status.outages.len(), 1);
        assert_eq!(status.outages[0].outage.title, "Upcoming");
    }
}

//! Utility helpers — timestamps and versioned file names.

use std::path::Path;

use chrono::{DateTime, Local, TimeZone};

/// Stamp used in versioned file names, e.g. `20140512-130501`.
pub fn file_stamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Insert a stamp before the extension: `outages.ics` → `outages-<stamp>.ics`.
///
/// `extension` replaces the file's own extension when given.
pub fn versioned_name(file_name: &str, stamp: &str, extension: Option<&str>) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = extension
        .map(str::to_string)
        .or_else(|| path.extension().map(|e| e.to_string_lossy().into_owned()));

    match ext {
        Some(ext) if !ext.is_empty() => format!("{stem}-{stamp}.{ext}"),
        _ => format!("{stem}-{stamp}"),
    }
}

/// Format a Unix timestamp (seconds) as a local date and time.
pub fn format_unix(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        chrono::LocalResult::Ambiguous(dt, _) => dt.format("%Y-%m-%d %H:%M").to_string(),
        chrono::LocalResult::None => "—".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_file_stamp_format() {
        let dt = Utc.with_ymd_and_hms(2014, 5, 12, 13, 5, 1).unwrap();
        assert_eq!(file_stamp(&dt), "20140512-130501");
    }

    #[test]
    fn test_versioned_name_keeps_extension() {
        assert_eq!(
            versioned_name("outages.ics", "20140512-130501", None),
            "outages-20140512-130501.ics"
        );
    }

    #[test]
    fn test_versioned_name_replaces_extension() {
        assert_eq!(
            versioned_name("outages.xml", "20140512-130501", Some("xml")),
            "outages-20140512-130501.xml"
        );
        assert_eq!(
            versioned_name("feed.rss", "s", Some("xml")),
            "feed-s.xml"
        );
    }

    #[test]
    fn test_versioned_name_without_extension() {
        assert_eq!(versioned_name("outages", "s", None), "outages-s");
        assert_eq!(versioned_name("outages", "s", Some("ics")), "outages-s.ics");
    }

    #[test]
    fn test_unix_now_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(unix_now() > 1_577_836_800);
    }

    #[test]
    fn test_format_unix_shape() {
        let s = format_unix(1_400_000_000);
        assert_eq!(s.len(), 16);
        assert_eq!(s.chars().nth(4), Some('-'));
        assert_eq!(s.chars().nth(13), Some(':'));
    }
}

//! Minimal RFC 5545 reader — enough of iCalendar to pull events out of a
//! calendar export.
//!
//! Handles line unfolding, `NAME;PARAM=VALUE:value` content lines (quoted
//! parameter values included), nested `BEGIN`/`END` components, TEXT
//! unescaping, and DATE / DATE-TIME values.

use chrono::{Local, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use tracing::{debug, warn};

use crate::error::IcalError;

// ─────────────────────────────────────────────
// Property / Component
// ─────────────────────────────────────────────

/// One content line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    /// Upper-cased property name.
    pub name: String,
    /// Parameters with upper-cased names and unquoted values.
    pub params: Vec<(String, String)>,
    /// Raw value (still escaped for TEXT properties).
    pub value: String,
}

impl Property {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value with TEXT escapes resolved.
    pub fn text(&self) -> String {
        unescape_text(&self.value)
    }

    /// DATE or DATE-TIME value as a Unix timestamp (seconds).
    pub fn timestamp(&self) -> Result<i64, IcalError> {
        parse_timestamp(&self.value, self.param("TZID"))
    }
}

/// A `BEGIN:X` … `END:X` block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// First property called `name`.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// This component and all nested components, depth first.
    pub fn walk(&self) -> Vec<&Component> {
        let mut out = vec![self];
        for child in &self.components {
            out.extend(child.walk());
        }
        out
    }

    /// All `VEVENT` components in the tree.
    pub fn events(&self) -> Vec<&Component> {
        self.walk()
            .into_iter()
            .filter(|c| c.name == "VEVENT")
            .collect()
    }
}

// ─────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────

/// Parse a calendar document into its `VCALENDAR` component.
pub fn parse_calendar(text: &str) -> Result<Component, IcalError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut stack: Vec<Component> = Vec::new();
    let mut root: Option<Component> = None;

    for (line_no, line) in unfold(text) {
        if line.trim().is_empty() {
            continue;
        }
        let prop = parse_content_line(&line, line_no)?;

        match prop.name.as_str() {
            "BEGIN" => stack.push(Component::new(prop.value.trim().to_uppercase())),
            "END" => {
                let name = prop.value.trim().to_uppercase();
                let component = stack.pop().ok_or_else(|| IcalError::Malformed {
                    line: line_no,
                    message: format!("END:{name} without matching BEGIN"),
                })?;
                if component.name != name {
                    return Err(IcalError::Malformed {
                        line: line_no,
                        message: format!("END:{name} closes BEGIN:{}", component.name),
                    });
                }
                match stack.last_mut() {
                    Some(parent) => parent.components.push(component),
                    None if root.is_none() => root = Some(component),
                    None => warn!(line = line_no, "ignoring additional top-level component"),
                }
            }
            _ => match stack.last_mut() {
                Some(component) => component.properties.push(prop),
                None => {
                    return Err(IcalError::Malformed {
                        line: line_no,
                        message: format!("property {} outside of any component", prop.name),
                    })
                }
            },
        }
    }

    if let Some(open) = stack.last() {
        return Err(IcalError::Malformed {
            line: text.lines().count(),
            message: format!("BEGIN:{} is never closed", open.name),
        });
    }

    match root {
        Some(root) if root.name == "VCALENDAR" => {
            debug!(events = root.events().len(), "parsed calendar");
            Ok(root)
        }
        _ => Err(IcalError::NotCalendar),
    }
}

/// Join folded lines. Returns each logical line with the number of the
/// physical line it started on.
pub fn unfold(text: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (idx, raw) in text.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.starts_with([' ', '\t']) {
            if let Some((_, current)) = lines.last_mut() {
                current.push_str(&raw[1..]);
                continue;
            }
        }
        lines.push((idx + 1, raw.to_string()));
    }

    lines
}

fn parse_content_line(line: &str, line_no: usize) -> Result<Property, IcalError> {
    let malformed = |message: &str| IcalError::Malformed {
        line: line_no,
        message: message.to_string(),
    };

    let colon = find_unquoted(line, ':').ok_or_else(|| malformed("missing ':' separator"))?;
    let (head, value) = (&line[..colon], &line[colon + 1..]);

    let mut parts = split_unquoted(head, ';').into_iter();
    let name = parts
        .next()
        .map(|n| n.trim().to_uppercase())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| malformed("empty property name"))?;

    let mut params = Vec::new();
    for part in parts {
        let (key, val) = part
            .split_once('=')
            .ok_or_else(|| malformed("parameter without '='"))?;
        params.push((
            key.trim().to_uppercase(),
            val.trim().trim_matches('"').to_string(),
        ));
    }

    Ok(Property {
        name,
        params,
        value: value.to_string(),
    })
}

fn find_unquoted(s: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == needle && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_unquoted(s: &str, delim: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(pos) = find_unquoted(rest, delim) {
        parts.push(&rest[..pos]);
        rest = &rest[pos + delim.len_utf8()..];
    }
    parts.push(rest);
    parts
}

/// Resolve TEXT escapes: `\n` / `\N` → newline, `\,` `\;` `\\` → literal.
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Convert a DATE or DATE-TIME value to a Unix timestamp.
///
/// `...Z` values are UTC. Floating values and values carrying a `TZID` are
/// read in the host's local time zone. Dates map to local midnight.
pub fn parse_timestamp(value: &str, tzid: Option<&str>) -> Result<i64, IcalError> {
    let value = value.trim();
    let bad = || IcalError::DateTime(value.to_string());

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").map_err(|_| bad())?;
        return Ok(Utc.from_utc_datetime(&naive).timestamp());
    }

    let naive = if value.contains('T') {
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").map_err(|_| bad())?
    } else {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|_| bad())?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(bad)?
    };

    if let Some(tzid) = tzid {
        debug!(tzid = %tzid, value = %value, "reading TZID value in local time");
    }

    local_timestamp(&Local, &naive).ok_or_else(bad)
}

/// Unix time of a wall-clock reading in `tz`.
///
/// Ambiguous readings take the earlier instant. A reading inside a forward
/// transition gap uses the offset in force just before the jump, so 02:30 on
/// a 02:00 → 03:00 night becomes 03:30.
fn local_timestamp<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> Option<i64> {
    if let Some(dt) = tz.from_local_datetime(naive).earliest() {
        return Some(dt.timestamp());
    }
    let before = (1..=24)
        .filter_map(|hours| naive.checked_sub_signed(TimeDelta::hours(hours)))
        .find_map(|earlier| tz.from_local_datetime(&earlier).earliest())?;
    let offset = i64::from(before.offset().fix().local_minus_utc());
    Some(Utc.from_utc_datetime(naive).timestamp() - offset)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

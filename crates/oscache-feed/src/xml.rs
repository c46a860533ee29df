//! Notifications feed writer.
//!
//! Clients read this file, and the updater byte-compares successive versions
//! to detect changes, so the layout is fixed:
//!
//! ```text
//! <?xml version='1.0' encoding='ASCII'?>
//! <outages>
//!   <item>
//!     <title>..</title>
//!     <link>..</link>
//!     <resolved>True|False</resolved>
//!     <start_time>..</start_time>
//!     <end_time>..</end_time>
//!     <mod_time>..</mod_time>
//!   </item>
//! </outages>
//! ```

use std::fmt::Write as _;

use oscache_core::config::schema::format_bool;

use crate::outage::Outage;

pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='ASCII'?>";

/// `end_time` text for outages without a distinct end.
pub const OPEN_ENDED: &str = "0000000000";

/// Render outages as the notifications document.
pub fn render(outages: &[Outage]) -> String {
    let mut out = String::new();
    out.push_str(XML_DECLARATION);
    out.push('\n');

    if outages.is_empty() {
        out.push_str("<outages/>\n");
        return out;
    }

    out.push_str("<outages>\n");
    for outage in outages {
        let end_time = outage
            .end_time
            .map(|t| t.to_string())
            .unwrap_or_else(|| OPEN_ENDED.to_string());

        out.push_str("  <item>\n");
        element(&mut out, "title", &outage.title);
        element(&mut out, "link", &outage.link);
        element(&mut out, "resolved", format_bool(outage.resolved));
        element(&mut out, "start_time", &outage.start_time.to_string());
        element(&mut out, "end_time", &end_time);
        element(&mut out, "mod_time", &outage.mod_time.to_string());
        out.push_str("  </item>\n");
    }
    out.push_str("</outages>\n");
    out
}

fn element(out: &mut String, name: &str, text: &str) {
    let _ = writeln!(out, "    <{name}>{}</{name}>", escape_text(text));
}

/// Escape text content for an ASCII-encoded document.
///
/// Markup characters become entities; anything outside ASCII becomes a
/// decimal character reference.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            c if c.is_ascii() => out.push(c),
            c => {
                let _ = write!(out, "&#{};", c as u32);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outage(title: &str, resolved: bool, end_time: Option<i64>) -> Outage {
        Outage {
            title: title.into(),
            link: "https://example.edu/event?id=1&view=full".into(),
            description: "ignored".into(),
            resolved,
            start_time: 1_399_899_600,
            end_time,
            mod_time: 1_399_907_100,
        }
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(
            render(&[]),
            "<?xml version='1.0' encoding='ASCII'?>\n<outages/>\n"
        );
    }

    #[test]
    fn test_render_items() {
        let xml = render(&[
            outage("Mail outage", true, Some(1_399_906_800)),
            outage("VPN", false, None),
        ]);
        let expected = "\
<?xml version='1.0' encoding='ASCII'?>
<outages>
  <item>
    <title>Mail outage</title>
    <link>https://example.edu/event?id=1&amp;view=full</link>
    <resolved>True</resolved>
    <start_time>1399899600</start_time>
    <end_time>1399906800</end_time>
    <mod_time>1399907100</mod_time>
  </item>
  <item>
    <title>VPN</title>
    <link>https://example.edu/event?id=1&amp;view=full</link>
    <resolved>False</resolved>
    <start_time>1399899600</start_time>
    <end_time>0000000000</end_time>
    <mod_time>1399907100</mod_time>
  </item>
</outages>
";
        assert_eq!(xml, expected);
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_text("Café"), "Caf&#233;");
        assert_eq!(escape_text("plain 'quotes' \"ok\""), "plain 'quotes' \"ok\"");
    }

    #[test]
    fn test_render_is_deterministic() {
        let outages = vec![outage("x", false, None)];
        assert_eq!(render(&outages), render(&outages));
    }
}

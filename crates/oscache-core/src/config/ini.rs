//! INI document model — ordered sections of ordered `key = value` entries.
//!
//! The accepted syntax is the one Python's ConfigParser reads, since that is
//! what existing deployments were written against:
//!
//! - `[Section]` headers (names are case-sensitive)
//! - `key = value` or `key: value` entries (keys are lower-cased)
//! - whole-line comments starting with `#` or `;`
//! - indented lines continuing the previous value
//!
//! Comment lines directly above an entry stay attached to it as doc lines, so
//! a document written back out still documents each key.

use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

use super::error::ConfigError;

// ─────────────────────────────────────────────
// Entry / Section
// ─────────────────────────────────────────────

/// A single `key = value` pair with the comment lines documenting it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    /// Comment text (without the leading `#`) found directly above the entry.
    pub doc: Vec<String>,
}

/// A named `[Section]` and its entries, in file order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    entries: Vec<Entry>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Raw value for `key` (keys are compared lower-cased).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entry(key).map(|e| e.value.as_str())
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        let key = key.to_lowercase();
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Set a value, keeping the existing doc lines when the key is already present.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let key = key.to_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(Entry {
                key,
                value,
                doc: Vec::new(),
            }),
        }
    }

    /// Set a value together with its doc lines.
    pub fn set_documented(&mut self, key: &str, value: impl Into<String>, doc: Vec<String>) {
        self.set(key, value);
        let key = key.to_lowercase();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.doc = doc;
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }
}

// ─────────────────────────────────────────────
// IniDocument
// ─────────────────────────────────────────────

/// A parsed INI file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<Section>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text.
    ///
    /// A repeated section header continues the earlier section; a repeated key
    /// overwrites the earlier value and logs a warning.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut doc = IniDocument::new();
        let mut current: Option<usize> = None;
        let mut pending_doc: Vec<String> = Vec::new();
        // (section index, entry index) of the entry a continuation line extends.
        let mut last_entry: Option<(usize, usize)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_end();

            if line.trim().is_empty() {
                pending_doc.clear();
                last_entry = None;
                continue;
            }

            if line.starts_with('#') || line.starts_with(';') {
                pending_doc.push(line[1..].trim().to_string());
                last_entry = None;
                continue;
            }

            let trimmed = line.trim_start();

            if line.starts_with(char::is_whitespace) {
                if let Some((s, e)) = last_entry {
                    let entry = &mut doc.sections[s].entries[e];
                    entry.value.push('\n');
                    entry.value.push_str(trimmed);
                    continue;
                }
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let end = rest.find(']').ok_or_else(|| ConfigError::Syntax {
                    line: line_no,
                    message: "unterminated section header".into(),
                })?;
                let name = rest[..end].trim();
                if name.is_empty() {
                    return Err(ConfigError::Syntax {
                        line: line_no,
                        message: "empty section name".into(),
                    });
                }
                let index = match doc.sections.iter().position(|s| s.name == name) {
                    Some(i) => i,
                    None => {
                        doc.sections.push(Section::new(name));
                        doc.sections.len() - 1
                    }
                };
                current = Some(index);
                pending_doc.clear();
                last_entry = None;
                continue;
            }

            let section_idx = current.ok_or_else(|| ConfigError::Syntax {
                line: line_no,
                message: "entry appears before any section header".into(),
            })?;

            let (key, value) = split_entry(trimmed).ok_or_else(|| ConfigError::Syntax {
                line: line_no,
                message: format!("expected `key = value`, found {trimmed:?}"),
            })?;

            let section = &mut doc.sections[section_idx];
            let doc_lines = std::mem::take(&mut pending_doc);
            let entry_idx = match section.position(&key) {
                Some(pos) => {
                    warn!(
                        section = %section.name,
                        key = %key,
                        line = line_no,
                        "duplicate key, later value wins"
                    );
                    let entry = &mut section.entries[pos];
                    entry.value = value;
                    if !doc_lines.is_empty() {
                        entry.doc = doc_lines;
                    }
                    pos
                }
                None => {
                    section.entries.push(Entry {
                        key,
                        value,
                        doc: doc_lines,
                    });
                    section.entries.len() - 1
                }
            };
            last_entry = Some((section_idx, entry_idx));
        }

        Ok(doc)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// Get a section, appending an empty one if it does not exist yet.
    pub fn section_or_insert(&mut self, name: &str) -> &mut Section {
        let index = match self.sections.iter().position(|s| s.name == name) {
            Some(i) => i,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[index]
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.section_or_insert(section).set(key, value);
    }

    /// Flat view: section name → key → value, without doc lines.
    pub fn to_map(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.sections
            .iter()
            .map(|s| {
                let entries = s
                    .entries
                    .iter()
                    .map(|e| (e.key.clone(), e.value.clone()))
                    .collect();
                (s.name.clone(), entries)
            })
            .collect()
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for entry in &section.entries {
                for doc in &entry.doc {
                    if doc.is_empty() {
                        writeln!(f, "#")?;
                    } else {
                        writeln!(f, "# {doc}")?;
                    }
                }
                let mut lines = entry.value.split('\n');
                let first = lines.next().unwrap_or_default();
                if first.is_empty() {
                    writeln!(f, "{} =", entry.key)?;
                } else {
                    writeln!(f, "{} = {}", entry.key, first)?;
                }
                for continuation in lines {
                    writeln!(f, "\t{continuation}")?;
                }
            }
        }
        Ok(())
    }
}

/// Split `key = value` / `key: value` at the first delimiter.
///
/// The value loses a trailing ` ; comment` and a bare `""` reads as empty.
fn split_entry(line: &str) -> Option<(String, String)> {
    let delim = line.find(['=', ':'])?;
    let key = line[..delim].trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    Some((key, normalize_value(&line[delim + 1..])))
}

/// Read a raw value the way a file line is read.
///
/// Trims, drops a trailing ` ; comment`, and turns a bare `""` into an empty
/// string. Values set from outside a file go through this so they serialize
/// back to the same text.
pub fn normalize_value(raw: &str) -> String {
    let mut value = raw.trim();
    if let Some(pos) = value.find(" ;").or_else(|| value.find("\t;")) {
        value = value[..pos].trim_end();
    }
    if value == "\"\"" {
        value = "";
    }
    value.to_string()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

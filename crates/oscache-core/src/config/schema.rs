//! Configuration schema — typed view of the INI sections.
//!
//! Hierarchy: `Config` → `DebuggingConfig`, `ParsingConfig`, `SourcesConfig`,
//! `WorkingFilesConfig`, `StatesConfig`.
//!
//! Section and key names are part of the deployment contract and must not be
//! renamed. `Config::from_document` validates; `Config::to_document` writes
//! every key back with a `# default: ...` doc line above it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use tracing::warn;

use super::error::ConfigError;
use super::ini::{IniDocument, Section};

// ─────────────────────────────────────────────
// Section / key names
// ─────────────────────────────────────────────

pub const DEBUGGING: &str = "Debugging";
pub const PARSING: &str = "Parsing";
pub const SOURCES: &str = "Sources";
pub const WORKING_FILES: &str = "WorkingFiles";
pub const STATES: &str = "States";

/// All sections the schema knows about, in file order.
pub const KNOWN_SECTIONS: &[&str] = &[DEBUGGING, PARSING, SOURCES, WORKING_FILES, STATES];

// ─────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────

pub const DEFAULT_DEBUG_LEVEL: DebugLevel = DebugLevel::NotSet;
pub const DEFAULT_LOG_FILE: &str = "/var/log/os_calendar_cache.log";
pub const DEFAULT_RESOLVED_PATTERN: &str = "Resolved:";
/// One week.
pub const DEFAULT_SCOPE_AHEAD: u64 = 7 * 24 * 60 * 60;
/// One day.
pub const DEFAULT_SCOPE_PAST: u64 = 24 * 60 * 60;
pub const DEFAULT_FEED_URL: &str = "https://www.example.edu/calendar/export.ics";
pub const DEFAULT_WEBSITE_URL: &str = "https://www.example.edu/outages";
pub const DEFAULT_URL_TIMEOUT: u64 = 10;
pub const DEFAULT_WORKING_DIRECTORY: &str = "/var/cache/os_calendar_cache";
pub const DEFAULT_CACHE: &str = "outages.ics";
pub const DEFAULT_NOTIFICATIONS: &str = "outages.xml";
pub const DEFAULT_PRESERVE_VERSIONS: bool = false;

// ─────────────────────────────────────────────
// DebugLevel
// ─────────────────────────────────────────────

/// Logging severity, named as in Python's `logging` module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    /// Logging disabled.
    #[default]
    NotSet,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl DebugLevel {
    pub const ALL: [DebugLevel; 6] = [
        DebugLevel::NotSet,
        DebugLevel::Debug,
        DebugLevel::Info,
        DebugLevel::Warning,
        DebugLevel::Error,
        DebugLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DebugLevel::NotSet => "NOTSET",
            DebugLevel::Debug => "DEBUG",
            DebugLevel::Info => "INFO",
            DebugLevel::Warning => "WARNING",
            DebugLevel::Error => "ERROR",
            DebugLevel::Critical => "CRITICAL",
        }
    }

    /// Whether any log output should be produced at this level.
    pub fn is_enabled(&self) -> bool {
        *self != DebugLevel::NotSet
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebugLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NOTSET" => Ok(DebugLevel::NotSet),
            "DEBUG" => Ok(DebugLevel::Debug),
            "INFO" => Ok(DebugLevel::Info),
            "WARNING" | "WARN" => Ok(DebugLevel::Warning),
            "ERROR" => Ok(DebugLevel::Error),
            "CRITICAL" | "FATAL" => Ok(DebugLevel::Critical),
            _ => Err("debugging level was not recognized \
                      (expected NOTSET, DEBUG, INFO, WARNING, ERROR, or CRITICAL)"
                .into()),
        }
    }
}

// ─────────────────────────────────────────────
// Outage states and their notification style
// ─────────────────────────────────────────────

/// Desktop notification urgency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "URGENCY_LOW",
            Urgency::Normal => "URGENCY_NORMAL",
            Urgency::Critical => "URGENCY_CRITICAL",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "URGENCY_LOW" => Ok(Urgency::Low),
            "URGENCY_NORMAL" => Ok(Urgency::Normal),
            "URGENCY_CRITICAL" => Ok(Urgency::Critical),
            other => Err(format!(
                "unknown urgency {other:?} (expected URGENCY_LOW, URGENCY_NORMAL, or URGENCY_CRITICAL)"
            )),
        }
    }
}

/// Icon, timeout, and urgency for one outage state.
///
/// Encoded on disk as `icon-name:timeout-ms:URGENCY_*`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateStyle {
    pub icon: String,
    /// Display time in milliseconds. `0` keeps the notification until
    /// dismissed; `-1` leaves the choice to the notification server.
    pub timeout_ms: i32,
    pub urgency: Urgency,
}

impl StateStyle {
    pub fn new(icon: impl Into<String>, timeout_ms: i32, urgency: Urgency) -> Self {
        Self {
            icon: icon.into(),
            timeout_ms,
            urgency,
        }
    }
}

impl fmt::Display for StateStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.icon, self.timeout_ms, self.urgency)
    }
}

impl FromStr for StateStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        let [icon, timeout, urgency] = fields.as_slice() else {
            return Err(format!(
                "expected `icon:timeout:urgency` (3 fields), found {} field(s)",
                fields.len()
            ));
        };

        let icon = icon.trim();
        if icon.is_empty() {
            return Err("icon name is empty".into());
        }
        let timeout_ms: i32 = timeout
            .trim()
            .parse()
            .map_err(|_| format!("timeout {timeout:?} is not an integer"))?;
        if timeout_ms < -1 {
            return Err(format!("timeout {timeout_ms} is below -1"));
        }
        let urgency = urgency.trim().parse()?;

        Ok(StateStyle::new(icon, timeout_ms, urgency))
    }
}

/// Outage state names, as used for the `States` section keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutageState {
    Active,
    Completed,
    Default,
    Error,
    None,
    Scheduled,
}

impl OutageState {
    pub const ALL: [OutageState; 6] = [
        OutageState::Active,
        OutageState::Completed,
        OutageState::Default,
        OutageState::Error,
        OutageState::None,
        OutageState::Scheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutageState::Active => "active",
            OutageState::Completed => "completed",
            OutageState::Default => "default",
            OutageState::Error => "error",
            OutageState::None => "none",
            OutageState::Scheduled => "scheduled",
        }
    }

    /// Built-in style used when the `States` section omits this state.
    pub fn default_style(&self) -> StateStyle {
        match self {
            OutageState::Active => StateStyle::new("outages-active", 0, Urgency::Critical),
            OutageState::Completed => StateStyle::new("outages-completed", 10_000, Urgency::Low),
            OutageState::Default => StateStyle::new("outages-default", 10_000, Urgency::Normal),
            OutageState::Error => StateStyle::new("outages-error", 10_000, Urgency::Normal),
            OutageState::None => StateStyle::new("outages-none", 5_000, Urgency::Low),
            OutageState::Scheduled => StateStyle::new("outages-scheduled", 10_000, Urgency::Normal),
        }
    }
}

impl fmt::Display for OutageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────

/// `[Debugging]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebuggingConfig {
    pub debug_level: DebugLevel,
    /// Only written to when `debug_level` is not `NOTSET`.
    pub log_file: PathBuf,
}

impl Default for DebuggingConfig {
    fn default() -> Self {
        Self {
            debug_level: DEFAULT_DEBUG_LEVEL,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

/// `[Parsing]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsingConfig {
    /// Regular expression marking an outage description as resolved.
    pub resolved_pattern: String,
    /// Seconds after now still shown as upcoming.
    pub scope_ahead: u64,
    /// Seconds before now still shown as recent.
    pub scope_past: u64,
}

impl ParsingConfig {
    /// Compile `resolved_pattern` in multi-line mode.
    pub fn resolved_regex(&self) -> Result<Regex, regex::Error> {
        regex::RegexBuilder::new(&self.resolved_pattern)
            .multi_line(true)
            .build()
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            resolved_pattern: DEFAULT_RESOLVED_PATTERN.to_string(),
            scope_ahead: DEFAULT_SCOPE_AHEAD,
            scope_past: DEFAULT_SCOPE_PAST,
        }
    }
}

/// `[Sources]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcesConfig {
    pub feed_url: String,
    pub website_url: String,
    /// Connection timeout in seconds.
    pub url_timeout: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            website_url: DEFAULT_WEBSITE_URL.to_string(),
            url_timeout: DEFAULT_URL_TIMEOUT,
        }
    }
}

/// `[WorkingFiles]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkingFilesConfig {
    pub working_directory: PathBuf,
    /// File name for the downloaded feed, relative to `working_directory`.
    pub cache: String,
    /// File name for the XML notifications feed, relative to `working_directory`.
    pub notifications: String,
    /// Keep downloaded feeds and unchanged XML candidates instead of deleting them.
    pub preserve_versions: bool,
}

impl WorkingFilesConfig {
    pub fn cache_path(&self) -> PathBuf {
        self.working_directory.join(&self.cache)
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.working_directory.join(&self.notifications)
    }
}

impl Default for WorkingFilesConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from(DEFAULT_WORKING_DIRECTORY),
            cache: DEFAULT_CACHE.to_string(),
            notifications: DEFAULT_NOTIFICATIONS.to_string(),
            preserve_versions: DEFAULT_PRESERVE_VERSIONS,
        }
    }
}

/// `[States]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatesConfig {
    pub active: StateStyle,
    pub completed: StateStyle,
    pub default: StateStyle,
    pub error: StateStyle,
    pub none: StateStyle,
    pub scheduled: StateStyle,
}

impl StatesConfig {
    pub fn style(&self, state: OutageState) -> &StateStyle {
        match state {
            OutageState::Active => &self.active,
            OutageState::Completed => &self.completed,
            OutageState::Default => &self.default,
            OutageState::Error => &self.error,
            OutageState::None => &self.none,
            OutageState::Scheduled => &self.scheduled,
        }
    }

    fn style_mut(&mut self, state: OutageState) -> &mut StateStyle {
        match state {
            OutageState::Active => &mut self.active,
            OutageState::Completed => &mut self.completed,
            OutageState::Default => &mut self.default,
            OutageState::Error => &mut self.error,
            OutageState::None => &mut self.none,
            OutageState::Scheduled => &mut self.scheduled,
        }
    }
}

impl Default for StatesConfig {
    fn default() -> Self {
        Self {
            active: OutageState::Active.default_style(),
            completed: OutageState::Completed.default_style(),
            default: OutageState::Default.default_style(),
            error: OutageState::Error.default_style(),
            none: OutageState::None.default_style(),
            scheduled: OutageState::Scheduled.default_style(),
        }
    }
}

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration.
///
/// `Config::default()` is the template `oscache config init` writes; it is not
/// a fallback for missing required keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub debugging: DebuggingConfig,
    pub parsing: ParsingConfig,
    pub sources: SourcesConfig,
    pub working_files: WorkingFilesConfig,
    pub states: StatesConfig,
}

impl Config {
    /// Build a validated config from a parsed document.
    pub fn from_document(doc: &IniDocument) -> Result<Self, ConfigError> {
        for section in doc.sections() {
            if !KNOWN_SECTIONS.contains(&section.name.as_str()) {
                warn!(section = %section.name, "ignoring unknown config section");
            }
        }

        let debugging = {
            let s = Fields::required(doc, DEBUGGING)?;
            s.warn_unknown(&["debug_level", "log_file"]);
            DebuggingConfig {
                debug_level: s.parse("debug_level")?,
                log_file: s.absolute_path("log_file")?,
            }
        };

        let parsing = {
            let s = Fields::required(doc, PARSING)?;
            s.warn_unknown(&["resolved_pattern", "scope_ahead", "scope_past"]);
            let resolved_pattern = s.string("resolved_pattern")?;
            if let Err(e) = regex::Regex::new(&resolved_pattern) {
                return Err(s.invalid("resolved_pattern", &resolved_pattern, e.to_string()));
            }
            ParsingConfig {
                resolved_pattern,
                scope_ahead: s.parse_or("scope_ahead", DEFAULT_SCOPE_AHEAD)?,
                scope_past: s.parse_or("scope_past", DEFAULT_SCOPE_PAST)?,
            }
        };

        let sources = {
            let s = Fields::required(doc, SOURCES)?;
            s.warn_unknown(&["feed_url", "website_url", "url_timeout"]);
            let feed_url = s.string("feed_url")?;
            if !has_supported_scheme(&feed_url) {
                return Err(s.invalid(
                    "feed_url",
                    &feed_url,
                    "must start with http://, https://, or file://",
                ));
            }
            SourcesConfig {
                feed_url,
                website_url: s.string("website_url")?,
                url_timeout: s.parse_or("url_timeout", DEFAULT_URL_TIMEOUT)?,
            }
        };

        let working_files = {
            let s = Fields::required(doc, WORKING_FILES)?;
            s.warn_unknown(&["working_directory", "cache", "notifications", "preserve_versions"]);
            let working_directory = s.absolute_path("working_directory")?;
            let raw = s.string("working_directory")?;
            if raw.len() > 1 && raw.ends_with('/') {
                return Err(s.invalid("working_directory", &raw, "must not end with a slash"));
            }
            WorkingFilesConfig {
                working_directory,
                cache: s.file_name_or("cache", DEFAULT_CACHE)?,
                notifications: s.file_name_or("notifications", DEFAULT_NOTIFICATIONS)?,
                preserve_versions: match s.raw("preserve_versions") {
                    Some(v) => parse_bool(v)
                        .map_err(|reason| s.invalid("preserve_versions", v, reason))?,
                    None => DEFAULT_PRESERVE_VERSIONS,
                },
            }
        };

        let states = {
            let s = Fields::optional(doc, STATES);
            let known: Vec<&str> = OutageState::ALL.iter().map(|st| st.as_str()).collect();
            s.warn_unknown(&known);
            let mut states = StatesConfig::default();
            for state in OutageState::ALL {
                if s.raw(state.as_str()).is_some() {
                    *states.style_mut(state) = s.parse(state.as_str())?;
                }
            }
            states
        };

        Ok(Config {
            debugging,
            parsing,
            sources,
            working_files,
            states,
        })
    }

    /// Convert back into a document, every key preceded by its default.
    pub fn to_document(&self) -> IniDocument {
        let mut doc = IniDocument::new();

        let s = doc.section_or_insert(DEBUGGING);
        put(s, "debug_level", self.debugging.debug_level, DEFAULT_DEBUG_LEVEL);
        put(s, "log_file", self.debugging.log_file.display(), DEFAULT_LOG_FILE);

        let s = doc.section_or_insert(PARSING);
        put(s, "resolved_pattern", &self.parsing.resolved_pattern, DEFAULT_RESOLVED_PATTERN);
        put(s, "scope_ahead", self.parsing.scope_ahead, DEFAULT_SCOPE_AHEAD);
        put(s, "scope_past", self.parsing.scope_past, DEFAULT_SCOPE_PAST);

        let s = doc.section_or_insert(SOURCES);
        put(s, "feed_url", &self.sources.feed_url, DEFAULT_FEED_URL);
        put(s, "website_url", &self.sources.website_url, DEFAULT_WEBSITE_URL);
        put(s, "url_timeout", self.sources.url_timeout, DEFAULT_URL_TIMEOUT);

        let s = doc.section_or_insert(WORKING_FILES);
        let wf = &self.working_files;
        put(s, "working_directory", wf.working_directory.display(), DEFAULT_WORKING_DIRECTORY);
        put(s, "cache", &wf.cache, DEFAULT_CACHE);
        put(s, "notifications", &wf.notifications, DEFAULT_NOTIFICATIONS);
        put(
            s,
            "preserve_versions",
            format_bool(wf.preserve_versions),
            format_bool(DEFAULT_PRESERVE_VERSIONS),
        );

        let s = doc.section_or_insert(STATES);
        for state in OutageState::ALL {
            put(s, state.as_str(), self.states.style(state), state.default_style());
        }

        doc
    }

    /// Documented INI text for this config.
    pub fn to_ini_string(&self) -> String {
        self.to_document().to_string()
    }
}

fn put(section: &mut Section, key: &str, value: impl fmt::Display, default: impl fmt::Display) {
    section.set_documented(key, value.to_string(), vec![format!("default: {default}")]);
}

/// Parse a boolean written the way the config files spell it.
pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "True" => Ok(true),
        "False" => Ok(false),
        _ => Err("expected True or False".into()),
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn has_supported_scheme(url: &str) -> bool {
    ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}

// ─────────────────────────────────────────────
// Section reader
// ─────────────────────────────────────────────

/// Typed access to one section, producing errors that name it.
struct Fields<'a> {
    name: &'static str,
    section: Option<&'a Section>,
}

impl<'a> Fields<'a> {
    fn required(doc: &'a IniDocument, name: &'static str) -> Result<Self, ConfigError> {
        let section = doc
            .section(name)
            .ok_or_else(|| ConfigError::MissingSection(name.to_string()))?;
        Ok(Self {
            name,
            section: Some(section),
        })
    }

    fn optional(doc: &'a IniDocument, name: &'static str) -> Self {
        Self {
            name,
            section: doc.section(name),
        }
    }

    fn raw(&self, key: &str) -> Option<&'a str> {
        self.section.and_then(|s| s.get(key))
    }

    fn string(&self, key: &str) -> Result<String, ConfigError> {
        self.raw(key)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingKey {
                section: self.name.to_string(),
                key: key.to_string(),
            })
    }

    fn parse<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let value = self.string(key)?;
        value
            .parse()
            .map_err(|e: T::Err| self.invalid(key, &value, e.to_string()))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.raw(key) {
            Some(_) => self.parse(key),
            None => Ok(default),
        }
    }

    fn absolute_path(&self, key: &str) -> Result<PathBuf, ConfigError> {
        let value = self.string(key)?;
        if !Path::new(&value).is_absolute() {
            return Err(self.invalid(key, &value, "must be an absolute path"));
        }
        Ok(PathBuf::from(value))
    }

    fn file_name_or(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        let Some(value) = self.raw(key) else {
            return Ok(default.to_string());
        };
        if value.is_empty() || value == "." || value == ".." || value.contains('/') {
            return Err(self.invalid(key, value, "must be a plain file name"));
        }
        Ok(value.to_string())
    }

    fn invalid(&self, key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn warn_unknown(&self, known: &[&str]) {
        let Some(section) = self.section else { return };
        for key in section.keys() {
            if !known.contains(&key) {
                warn!(section = %self.name, key = %key, "ignoring unknown config key");
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

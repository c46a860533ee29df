//! Config loader — reads the INI file, merges env vars, and validates.
//!
//! # Loading precedence
//! 1. INI file (`--config`, else `$OSCACHE_CONFIG`, else `/etc/os_calendar_cache.conf`)
//! 2. Environment variables `OSCACHE_<SECTION>__<KEY>` (override the file)
//!
//! Unlike a best-effort loader, every failure is returned: the tool should not
//! run against a half-understood configuration.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::ConfigError;
use super::ini::{normalize_value, IniDocument};
use super::schema::{Config, KNOWN_SECTIONS};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/os_calendar_cache.conf";

/// Environment variable naming an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "OSCACHE_CONFIG";

/// Prefix of per-key environment overrides.
const ENV_PREFIX: &str = "OSCACHE_";

/// Config file path: `$OSCACHE_CONFIG` if set, else the system default.
pub fn get_config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load, override, and validate the configuration.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    let mut doc = load_document(&config_path)?;
    let applied = apply_env_overrides(&mut doc, std::env::vars());
    if applied > 0 {
        info!(count = applied, "applied config overrides from environment");
    }

    Config::from_document(&doc)
}

/// Parse and validate config text (no file access, no env overrides).
pub fn load_config_str(text: &str) -> Result<Config, ConfigError> {
    let doc = IniDocument::parse(text)?;
    Config::from_document(&doc)
}

/// Read and parse a config file without validating it.
pub fn load_document(path: &Path) -> Result<IniDocument, ConfigError> {
    debug!("Loading config from {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    IniDocument::parse(&content)
}

/// Save configuration to disk as documented INI text.
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    std::fs::write(path, config.to_ini_string()).map_err(io_err)?;
    debug!("Config saved to {}", path.display());
    Ok(())
}

/// Apply `OSCACHE_<SECTION>__<KEY>` overrides to a document.
///
/// The section is matched case-insensitively against the known sections and
/// the key is lower-cased, so `OSCACHE_WORKINGFILES__PRESERVE_VERSIONS=True`
/// sets `[WorkingFiles] preserve_versions`. Returns the number applied.
pub fn apply_env_overrides<I>(doc: &mut IniDocument, vars: I) -> usize
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut applied = 0;

    for (name, value) in vars {
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let Some((section, key)) = rest.split_once("__") else {
            continue;
        };
        let Some(section) = KNOWN_SECTIONS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(section))
        else {
            debug!(var = %name, "ignoring override for unknown section");
            continue;
        };
        if key.is_empty() {
            continue;
        }

        let key = key.to_lowercase();
        debug!(section = %section, key = %key, "config override from environment");
        doc.set(section, &key, normalize_value(&value));
        applied += 1;
    }

    applied
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DebugLevel;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CACHER_CONF: &str = include_str!("../../../../conf/os_calendar_cache.conf");
    const NOTIFIER_CONF: &str = include_str!("../../../../conf/os_outage_notifier.conf");

    fn write_temp_conf(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/path/os_calendar_cache.conf")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_cacher_sample() {
        let file = write_temp_conf(CACHER_CONF);
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.debugging.debug_level, DebugLevel::Info);
        assert_eq!(config.working_files.notifications, "outages.xml");
        assert!(!config.working_files.preserve_versions);
    }

    #[test]
    fn test_load_notifier_sample() {
        let config = load_config_str(NOTIFIER_CONF).unwrap();
        assert_eq!(config.sources.url_timeout, 5);
        assert_eq!(config.parsing.scope_ahead, 259_200);
        assert_eq!(config.states.active.icon, "outages-active");
        assert_eq!(config.states.active.timeout_ms, 0);
    }

    #[test]
    fn test_document_roundtrip_for_both_samples() {
        for sample in [CACHER_CONF, NOTIFIER_CONF] {
            let doc = IniDocument::parse(sample).unwrap();
            let reparsed = IniDocument::parse(&doc.to_string()).unwrap();
            assert_eq!(reparsed.to_map(), doc.to_map());
            assert_eq!(reparsed, doc);
        }
    }

    #[test]
    fn test_typed_roundtrip_for_both_samples() {
        for sample in [CACHER_CONF, NOTIFIER_CONF] {
            let config = load_config_str(sample).unwrap();
            let reloaded = load_config_str(&config.to_ini_string()).unwrap();
            assert_eq!(reloaded, config);
        }
    }

    #[test]
    fn test_samples_pair_doc_line_with_value_line() {
        for sample in [CACHER_CONF, NOTIFIER_CONF] {
            let doc = IniDocument::parse(sample).unwrap();
            for section in doc.sections() {
                for entry in section.entries() {
                    assert!(
                        !entry.doc.is_empty(),
                        "{}.{} has no doc line",
                        section.name,
                        entry.key
                    );
                }
            }
        }
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("os_calendar_cache.conf");

        let mut config = Config::default();
        config.sources.feed_url = "https://calendar.example.org/feed.ics".to_string();
        config.working_files.preserve_versions = true;

        save_config(&config, &path).unwrap();

        let reloaded = load_config(Some(&path)).unwrap();
        assert_eq!(reloaded.sources.feed_url, "https://calendar.example.org/feed.ics");
        assert!(reloaded.working_files.preserve_versions);
    }

    #[test]
    fn test_env_override_sets_value() {
        let mut doc = IniDocument::parse(CACHER_CONF).unwrap();
        let applied = apply_env_overrides(
            &mut doc,
            vars(&[
                ("OSCACHE_SOURCES__FEED_URL", "file:///tmp/feed.ics"),
                ("OSCACHE_WORKINGFILES__PRESERVE_VERSIONS", "True"),
            ]),
        );
        assert_eq!(applied, 2);

        let config = Config::from_document(&doc).unwrap();
        assert_eq!(config.sources.feed_url, "file:///tmp/feed.ics");
        assert!(config.working_files.preserve_versions);
    }

    #[test]
    fn test_env_override_strips_inline_comment() {
        let mut doc = IniDocument::parse(CACHER_CONF).unwrap();
        apply_env_overrides(
            &mut doc,
            vars(&[
                ("OSCACHE_PARSING__RESOLVED_PATTERN", "Resolved ;fixed"),
                ("OSCACHE_SOURCES__WEBSITE_URL", "  https://example.edu/status\t; old  "),
            ]),
        );
        let config = Config::from_document(&doc).unwrap();
        assert_eq!(config.parsing.resolved_pattern, "Resolved");
        assert_eq!(config.sources.website_url, "https://example.edu/status");
    }

    #[test]
    fn test_env_override_survives_roundtrip() {
        let mut doc = IniDocument::parse(CACHER_CONF).unwrap();
        apply_env_overrides(
            &mut doc,
            vars(&[
                ("OSCACHE_PARSING__RESOLVED_PATTERN", "Resolved ;fixed"),
                ("OSCACHE_SOURCES__WEBSITE_URL", "https://example.edu/outages ; moved"),
            ]),
        );
        let doc_text = doc.to_string();
        assert_eq!(IniDocument::parse(&doc_text).unwrap().to_map(), doc.to_map());

        let config = Config::from_document(&doc).unwrap();
        let reloaded = load_config_str(&config.to_ini_string()).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_env_override_is_validated() {
        let mut doc = IniDocument::parse(CACHER_CONF).unwrap();
        apply_env_overrides(&mut doc, vars(&[("OSCACHE_DEBUGGING__DEBUG_LEVEL", "LOUD")]));
        let err = Config::from_document(&doc).unwrap_err();
        assert_eq!(err.key(), Some("debug_level"));
    }

    #[test]
    fn test_env_override_ignores_unrelated_vars() {
        let mut doc = IniDocument::parse(CACHER_CONF).unwrap();
        let before = doc.clone();
        let applied = apply_env_overrides(
            &mut doc,
            vars(&[
                ("OSCACHE_CONFIG", "/etc/other.conf"),
                ("OSCACHE_NOPE__KEY", "x"),
                ("OSCACHE_SOURCES__", "x"),
                ("PATH", "/usr/bin"),
            ]),
        );
        assert_eq!(applied, 0);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_env_override_can_add_states_section() {
        let mut doc = IniDocument::parse(CACHER_CONF).unwrap();
        apply_env_overrides(
            &mut doc,
            vars(&[("OSCACHE_STATES__NONE", "quiet:1000:URGENCY_LOW")]),
        );
        let config = Config::from_document(&doc).unwrap();
        assert_eq!(config.states.none.icon, "quiet");
    }

    #[test]
    fn test_syntax_error_reported_from_file() {
        let file = write_temp_conf("[Debugging]\nnot an entry\n");
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
    }
}

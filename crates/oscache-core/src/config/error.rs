//! Configuration error type.
//!
//! Every variant that concerns file content names the section (and key, when
//! there is one) so a broken deployment can be fixed without reading code.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for loading, validating, and saving configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line could not be read as a section header, entry, or comment.
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A required section is absent.
    #[error("missing required section [{0}]")]
    MissingSection(String),

    /// A required key is absent from a section that is present.
    #[error("missing required key `{key}` in section [{section}]")]
    MissingKey { section: String, key: String },

    /// A key is present but its value cannot be used.
    #[error("invalid value {value:?} for `{key}` in section [{section}]: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// Section the error refers to, if any.
    pub fn section(&self) -> Option<&str> {
        match self {
            ConfigError::MissingSection(section) => Some(section),
            ConfigError::MissingKey { section, .. } | ConfigError::InvalidValue { section, .. } => {
                Some(section)
            }
            ConfigError::Io { .. } | ConfigError::Syntax { .. } => None,
        }
    }

    /// Key the error refers to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigError::MissingKey { key, .. } | ConfigError::InvalidValue { key, .. } => Some(key),
            _ => None,
        }
    }
}

//! Configuration system — INI document, typed schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use oscache_core::config;
//!
//! let cfg = config::load_config(None).expect("invalid configuration");
//! println!("Feed: {}", cfg.sources.feed_url);
//! ```

pub mod error;
pub mod ini;
pub mod loader;
pub mod schema;

// Re-export key types
pub use error::ConfigError;
pub use ini::IniDocument;
pub use loader::{get_config_path, load_config, load_config_str, save_config};
pub use schema::{Config, DebugLevel, OutageState, StateStyle, Urgency};

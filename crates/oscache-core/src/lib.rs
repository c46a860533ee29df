//! Core of os-calendar-cache: configuration and shared utilities.
//!
//! - [`config`] — INI parsing, typed schema, loader
//! - [`utils`] — timestamps and versioned file names

pub mod config;
pub mod utils;

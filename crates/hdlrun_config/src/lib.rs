//! Parsing and validation of `hdlrun.toml` configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`HdlrunConfig`]: run defaults, named run profiles, elaborator command
//! overrides, template toolchains and test-runtime path overrides.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_run, ResolvedRun};
pub use types::*;

//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{HdlrunConfig, RunProfile};
use hdlrun_lang::Backend;
use std::path::Path;

/// The configuration file name looked up in a project directory.
pub const CONFIG_FILE: &str = "hdlrun.toml";

/// Loads and validates an `hdlrun.toml` configuration from a project directory.
///
/// Reads `<project_dir>/hdlrun.toml`, parses it, and validates it.
pub fn load_config(project_dir: &Path) -> Result<HdlrunConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<HdlrunConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates an `hdlrun.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<HdlrunConfig, ConfigError> {
    let config: HdlrunConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates values that deserialization alone cannot check.
fn validate_config(config: &HdlrunConfig) -> Result<(), ConfigError> {
    validate_profile("run", &config.run)?;
    for (name, profile) in &config.runs {
        if name.is_empty() {
            return Err(ConfigError::ValidationError(
                "run profile names must not be empty".to_string(),
            ));
        }
        validate_profile(&format!("runs.{name}"), profile)?;
    }

    for (tag, backend) in &config.backends {
        tag.parse::<Backend>()
            .map_err(|e| ConfigError::ValidationError(format!("[backends.{tag}]: {e}")))?;
        if backend.command.is_empty() {
            return Err(ConfigError::MissingField(format!("backends.{tag}.command")));
        }
    }

    for (name, engine) in &config.engines {
        if engine.test.is_empty() {
            return Err(ConfigError::MissingField(format!("engines.{name}.test")));
        }
        if engine.build.iter().any(Vec::is_empty) {
            return Err(ConfigError::ValidationError(format!(
                "[engines.{name}]: build commands must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_profile(table: &str, profile: &RunProfile) -> Result<(), ConfigError> {
    if profile.waveform_file.is_some() && profile.vcd_file.is_some() {
        return Err(ConfigError::ValidationError(format!(
            "[{table}]: waveform_file and vcd_file are mutually exclusive"
        )));
    }
    if profile.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(format!(
            "[{table}]: timeout_secs must be positive"
        )));
    }
    Ok(())
}

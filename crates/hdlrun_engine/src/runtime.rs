//! Locating the installed test runtime.
//!
//! The runtime ships the VPI/VHPI libraries each simulator loads and the
//! Python interpreter that runs the tests. Its locations are queried from
//! `cocotb-config` unless configured explicitly.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::EngineError;
use crate::process::{run_command, CommandSpec};

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Explicit runtime locations; anything left `None` is discovered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeOverrides {
    /// The query program (default `cocotb-config`).
    pub config_command: Option<String>,
    /// Directory holding the simulator interface libraries.
    pub lib_dir: Option<PathBuf>,
    /// The runtime's shared-data directory.
    pub share_dir: Option<PathBuf>,
    /// The Python shared library.
    pub libpython: Option<PathBuf>,
    /// The Python interpreter.
    pub python_bin: Option<PathBuf>,
}

/// The resolved locations of the test runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestRuntime {
    /// Directory holding the simulator interface libraries.
    pub lib_dir: PathBuf,
    /// The runtime's shared-data directory.
    pub share_dir: PathBuf,
    /// The Python shared library, when known.
    pub libpython: Option<PathBuf>,
    /// The Python interpreter.
    pub python_bin: PathBuf,
}

impl TestRuntime {
    /// Resolves every location, querying the config program for missing ones.
    pub fn discover(overrides: &RuntimeOverrides) -> Result<Self, EngineError> {
        let program = overrides
            .config_command
            .clone()
            .unwrap_or_else(|| "cocotb-config".to_string());
        let ask = |flag: &str| query(&program, flag);

        let lib_dir = match &overrides.lib_dir {
            Some(dir) => dir.clone(),
            None => ask("--lib-dir")?,
        };
        let share_dir = match &overrides.share_dir {
            Some(dir) => dir.clone(),
            None => ask("--share")?,
        };
        let python_bin = match &overrides.python_bin {
            Some(bin) => bin.clone(),
            None => ask("--python-bin")?,
        };
        let libpython = match &overrides.libpython {
            Some(lib) => Some(lib.clone()),
            None => match ask("--libpython") {
                Ok(lib) => Some(lib),
                Err(e) => {
                    log::warn!("libpython not found: {e}");
                    None
                }
            },
        };

        let runtime = Self {
            lib_dir,
            share_dir,
            libpython,
            python_bin,
        };
        log::debug!("test runtime: {runtime:?}");
        Ok(runtime)
    }
}

fn query(program: &str, flag: &str) -> Result<PathBuf, EngineError> {
    let spec = CommandSpec::new(program).arg(flag);
    let output = run_command(&spec, Some(QUERY_TIMEOUT))
        .map_err(|e| EngineError::Runtime(e.to_string()))?;
    if !output.status.success() {
        return Err(EngineError::Runtime(format!(
            "`{spec}` failed: {}",
            output.failure_message()
        )));
    }
    let value = output.stdout.trim();
    if value.is_empty() {
        return Err(EngineError::Runtime(format!("`{spec}` printed nothing")));
    }
    Ok(PathBuf::from(value))
}

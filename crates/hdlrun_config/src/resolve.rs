//! Run resolution: merging `[run]` with a named `[runs.<name>]` profile.

use crate::error::ConfigError;
use crate::types::{HdlrunConfig, RunProfile, SourceConfig};
use std::path::PathBuf;

/// A run profile with `[run]` and the selected named profile merged.
#[derive(Debug, Clone)]
pub struct ResolvedRun {
    /// The selected profile name, or `None` for the bare `[run]` table.
    pub name: Option<String>,
    /// The merged settings.
    pub profile: RunProfile,
}

/// Resolves a run by overlaying the named profile on `[run]`.
///
/// Scalar settings in the named profile replace those of `[run]`. Parameters
/// and environment variables are merged key by key, extra arguments are
/// appended, and each language's source list is replaced only when the named
/// profile lists sources for it. A named `waveform_file` or `vcd_file`
/// replaces either spelling inherited from `[run]`.
pub fn resolve_run(config: &HdlrunConfig, name: Option<&str>) -> Result<ResolvedRun, ConfigError> {
    let Some(name) = name else {
        return Ok(ResolvedRun {
            name: None,
            profile: config.run.clone(),
        });
    };

    let named = config
        .runs
        .get(name)
        .ok_or_else(|| ConfigError::UnknownRun(name.to_string()))?;

    Ok(ResolvedRun {
        name: Some(name.to_string()),
        profile: config.run.overlay(named),
    })
}

impl RunProfile {
    /// Returns `self` with every setting present in `top` applied over it.
    pub fn overlay(&self, top: &RunProfile) -> RunProfile {
        let base = self.clone();

        let mut parameters = base.parameters;
        parameters.extend(top.parameters.clone());
        let mut extra_env = base.extra_env;
        extra_env.extend(top.extra_env.clone());
        let mut extra_args = base.extra_args;
        extra_args.extend(top.extra_args.iter().cloned());

        let (waveform_file, vcd_file) = if top.waveform_file.is_some() || top.vcd_file.is_some() {
            (top.waveform_file.clone(), top.vcd_file.clone())
        } else {
            (base.waveform_file, base.vcd_file)
        };

        RunProfile {
            engine: top.engine.clone().or(base.engine),
            language: top.language.clone().or(base.language),
            backend: top.backend.clone().or(base.backend),
            toplevel: top.toplevel.clone().or(base.toplevel),
            test_module: top.test_module.clone().or(base.test_module),
            sources: SourceConfig {
                verilog: pick_sources(&top.sources.verilog, base.sources.verilog),
                vhdl: pick_sources(&top.sources.vhdl, base.sources.vhdl),
            },
            design: top.design.clone().or(base.design),
            ports: top.ports.clone().or(base.ports),
            platform: top.platform.clone().or(base.platform),
            parameters,
            seed: top.seed.or(base.seed),
            extra_env,
            extra_args,
            timescale: top.timescale.or(base.timescale),
            working_directory: top.working_directory.clone().or(base.working_directory),
            waveform_file,
            vcd_file,
            timeout_secs: top.timeout_secs.or(base.timeout_secs),
        }
    }
}

fn pick_sources(top: &[PathBuf], base: Vec<PathBuf>) -> Vec<PathBuf> {
    if top.is_empty() {
        base
    } else {
        top.to_vec()
    }
}

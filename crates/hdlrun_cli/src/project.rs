//! Shared command plumbing: locating `hdlrun.toml`, turning run profiles
//! into requests and wiring up a coordinator.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hdlrun_config::{HdlrunConfig, RunProfile, SourceConfig, CONFIG_FILE};
use hdlrun_engine::{TemplateToolchain, ToolchainSet};
use hdlrun_lang::{Backend, BackendAdapter, Design};
use hdlrun_runner::{RunCoordinator, SimulationRequest};

use crate::{GlobalArgs, RunArgs};

/// The loaded configuration and the directory relative paths resolve against.
pub struct Project {
    /// The directory holding `hdlrun.toml`, or the current directory.
    pub dir: PathBuf,
    /// The parsed configuration; empty when no file was found.
    pub config: HdlrunConfig,
}

impl Project {
    /// Loads the project selected by the global flags.
    ///
    /// `--config` names the file directly. Otherwise the current directory
    /// and its parents are searched for `hdlrun.toml`; running without one
    /// is allowed and uses an empty configuration.
    pub fn load(global: &GlobalArgs) -> Result<Self, Box<dyn Error>> {
        let cwd = std::env::current_dir()?;
        if let Some(ref config_path) = global.config {
            let path = cwd.join(config_path);
            let file = if path.is_dir() { path.join(CONFIG_FILE) } else { path };
            let dir = file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.clone());
            let config = hdlrun_config::load_config_file(&file)?;
            log::debug!("loaded {}", file.display());
            return Ok(Self { dir, config });
        }

        match find_project_root(&cwd) {
            Some(dir) => {
                let config = hdlrun_config::load_config(&dir)?;
                log::debug!("loaded {}", dir.join(CONFIG_FILE).display());
                Ok(Self { dir, config })
            }
            None => Ok(Self {
                dir: cwd,
                config: HdlrunConfig::default(),
            }),
        }
    }

    /// Builds a coordinator from the configured backends, engines and runtime.
    pub fn coordinator(&self) -> Result<RunCoordinator, Box<dyn Error>> {
        let mut backends = BackendAdapter::new();
        for (tag, backend) in &self.config.backends {
            backends = backends.with_command(tag.parse::<Backend>()?, backend.command.clone());
        }

        let mut toolchains = ToolchainSet::new().with_runtime_overrides(self.config.runtime.clone());
        for (name, engine) in &self.config.engines {
            let template = TemplateToolchain::new(name, engine.build.clone(), engine.test.clone())?;
            toolchains = toolchains.with_template(name.clone(), template);
        }

        Ok(RunCoordinator::new(backends, toolchains, &self.dir))
    }
}

/// Walks up from `start` looking for `hdlrun.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

impl RunArgs {
    /// The command-line flags as a profile to overlay on the configured run.
    pub fn overrides(&self) -> RunProfile {
        RunProfile {
            engine: self.engine.clone(),
            language: self.language.clone(),
            backend: self.backend.clone(),
            toplevel: self.toplevel.clone(),
            test_module: self.test_module.clone(),
            sources: SourceConfig {
                verilog: self.verilog.clone(),
                vhdl: self.vhdl.clone(),
            },
            design: self.design.as_ref().map(|path| Design {
                entry: self.entry.clone(),
                ..Design::new(path)
            }),
            parameters: self.params.iter().cloned().collect(),
            seed: self.seed,
            extra_env: self.env.iter().cloned().collect(),
            extra_args: self.extra_args.clone(),
            timescale: self.timescale,
            working_directory: self.workdir.clone(),
            waveform_file: self.waveform.clone(),
            timeout_secs: self.timeout,
            ..RunProfile::default()
        }
    }
}

/// Turns a merged run profile into a request.
pub fn build_request(profile: RunProfile) -> Result<SimulationRequest, Box<dyn Error>> {
    let test_module = profile
        .test_module
        .ok_or("no test module given; set `test_module` in hdlrun.toml or pass --test-module")?;

    let mut request = SimulationRequest::new(test_module);
    if let Some(engine) = profile.engine {
        request.engine = engine;
    }
    if let Some(timescale) = profile.timescale {
        request.timescale = timescale;
    }
    if let Some(ports) = profile.ports {
        request.ports = ports;
    }
    request.sources = profile.sources.by_language();
    request.design = profile.design;
    request.toplevel = profile.toplevel;
    request.language = profile.language;
    request.backend = profile.backend;
    request.parameters = profile.parameters;
    request.seed = profile.seed;
    request.extra_env = profile.extra_env;
    request.extra_args = profile.extra_args;
    request.waveform_file = profile.waveform_file;
    request.vcd_file = profile.vcd_file;
    request.working_directory = profile.working_directory;
    request.platform = profile.platform;
    request.timeout = profile.timeout_secs.map(Duration::from_secs);
    Ok(request)
}

/// A short human-readable name for what a request simulates.
pub fn describe(request: &SimulationRequest) -> String {
    match (&request.toplevel, &request.design) {
        (Some(top), _) => top.clone(),
        (None, Some(design)) => design.path.display().to_string(),
        (None, None) => request.test_module.clone(),
    }
}

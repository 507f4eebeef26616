//! Resolution, staging and execution of one simulation request.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hdlrun_common::{ContentHash, HdlLanguage};
use hdlrun_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use hdlrun_engine::{
    compute_env, results_path, EngineError, EngineProfile, EnvInputs, SimulationJob,
    SimulatorAdapter, ToolchainSet, WaveformRequest,
};
use hdlrun_lang::{flatten_ports, BackendAdapter, BackendPlatform, Design, LanguageRegistry, Port};

use crate::entry::{resolve_test_entry, TestEntry};
use crate::error::RunError;
use crate::request::{SimulationRequest, DEFAULT_TOPLEVEL};
use crate::staging::{StagingDirectory, StagingError};

/// The outcome of a run that got as far as the engine.
#[derive(Clone, Debug)]
pub struct RunResult {
    /// Whether build and test succeeded.
    pub success: bool,
    /// The failure message (`Test failed: ...`) of an unsuccessful run.
    pub message: Option<String>,
    /// Warnings and errors collected during the run.
    pub diagnostics: Vec<Diagnostic>,
    /// The waveform at the caller's destination, if one was produced.
    pub waveform: Option<PathBuf>,
    /// The engine that ran.
    pub engine: String,
    /// The language the design was converted into, if a design was given.
    pub language: Option<HdlLanguage>,
    /// The random seed passed to the test runtime.
    pub seed: u64,
    /// Hashes of the files this run wrote into the staging directory.
    pub staged: BTreeMap<String, ContentHash>,
}

impl RunResult {
    /// Turns an unsuccessful result into [`RunError::RunFailure`].
    pub fn into_result(self) -> Result<Self, RunError> {
        if self.success {
            Ok(self)
        } else {
            Err(RunError::RunFailure {
                message: self
                    .message
                    .unwrap_or_else(|| "Test failed".to_string()),
            })
        }
    }
}

/// The fully resolved form of a request, computed before anything is staged.
struct Plan {
    profile: EngineProfile,
    registry: LanguageRegistry,
    toplevel: String,
    design: Option<Design>,
    waveform: Option<WaveformRequest>,
    conversion: Option<HdlLanguage>,
    platform: Option<BackendPlatform>,
    ports: Vec<Port>,
    entry: TestEntry,
    seed: u64,
}

/// Coordinates runs against a set of backends and toolchains.
#[derive(Debug)]
pub struct RunCoordinator {
    backends: BackendAdapter,
    toolchains: ToolchainSet,
    cwd: PathBuf,
    base_env: BTreeMap<String, String>,
}

impl RunCoordinator {
    /// Creates a coordinator resolving relative paths against `cwd`.
    ///
    /// The test environment starts from this process's environment.
    pub fn new(backends: BackendAdapter, toolchains: ToolchainSet, cwd: impl Into<PathBuf>) -> Self {
        Self {
            backends,
            toolchains,
            cwd: cwd.into(),
            base_env: std::env::vars().collect(),
        }
    }

    /// Replaces the environment the test environment is computed from.
    pub fn with_base_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.base_env = env;
        self
    }

    /// Runs `request` to completion.
    ///
    /// Invalid or unsupported requests fail with an error before any file is
    /// written. Build and test failures produce an unsuccessful [`RunResult`].
    pub fn run(&self, request: &SimulationRequest) -> Result<RunResult, RunError> {
        let sink = DiagnosticSink::new();
        let plan = self.plan(request, &sink)?;

        let mut staging = match &request.working_directory {
            Some(dir) => StagingDirectory::persistent(self.cwd.join(dir))?,
            None => StagingDirectory::ephemeral()?,
        };
        let sources = self.stage(request, &plan, &mut staging)?;
        let staged = staging
            .staged()
            .iter()
            .map(|(name, file)| (name.clone(), file.hash))
            .collect();

        let mut result = RunResult {
            success: false,
            message: None,
            diagnostics: Vec::new(),
            waveform: None,
            engine: plan.profile.name.to_string(),
            language: plan.conversion,
            seed: plan.seed,
            staged,
        };

        match self.execute(request, plan, staging.path(), sources, &sink, &mut result) {
            Ok(()) => result.success = true,
            Err(e) if e.is_execution_failure() => {
                result.message = Some(RunError::run_failure(&e).to_string());
            }
            Err(e) => return Err(e.into()),
        }
        result.diagnostics = sink.take_all();
        Ok(result)
    }

    /// Validates and resolves `request` without staging or running anything.
    ///
    /// Returns the warnings resolution produced.
    pub fn check(&self, request: &SimulationRequest) -> Result<Vec<Diagnostic>, RunError> {
        let sink = DiagnosticSink::new();
        self.plan(request, &sink)?;
        Ok(sink.take_all())
    }

    fn plan(&self, request: &SimulationRequest, sink: &DiagnosticSink) -> Result<Plan, RunError> {
        if request.waveform_file.is_some() && request.vcd_file.is_some() {
            return Err(RunError::Configuration(
                "waveform_file and vcd_file can't be used at the same time".to_string(),
            ));
        }
        let waveform = request
            .waveform_file
            .as_ref()
            .or(request.vcd_file.as_ref())
            .map(|path| WaveformRequest::new(path, &self.cwd))
            .transpose()
            .map_err(|e| RunError::Configuration(e.to_string()))?;

        let engine = request.engine.trim();
        if engine.is_empty() {
            return Err(RunError::Configuration("no simulator given".to_string()));
        }

        let toplevel = match (&request.toplevel, &request.design) {
            (Some(name), _) => name.clone(),
            (None, Some(_)) => DEFAULT_TOPLEVEL.to_string(),
            (None, None) => {
                return Err(RunError::Configuration(
                    "top-level name must be provided if no design is given".to_string(),
                ))
            }
        };

        let (profile, known) = EngineProfile::resolve(engine);
        if !known {
            if request.design.is_some() && request.language.is_none() {
                return Err(RunError::Configuration(format!(
                    "'language' must be provided when using unknown simulator ({engine})"
                )));
            }
            sink.emit(
                Diagnostic::warning(
                    DiagnosticCode::UNKNOWN_SIMULATOR,
                    format!("using unknown simulator: {engine}"),
                )
                .with_help(format!("configure a command template under [engines.{engine}]")),
            );
        }

        let registry = self.backends.resolve(request.backend.as_deref())?;
        let explicit = match &request.language {
            Some(tag) => {
                let lang = registry.get(tag)?.id;
                profile.check_language(lang)?;
                Some(lang)
            }
            None => None,
        };

        if let Some(waveform) = &waveform {
            profile.check_waveform(waveform.format)?;
        }

        for lang in request.source_languages() {
            if !profile.supports(lang) {
                return Err(RunError::Configuration(format!(
                    "simulator {engine} doesn't support {lang} sources"
                )));
            }
        }

        let (conversion, platform, ports) = match &request.design {
            Some(_) => {
                let lang = explicit
                    .or_else(|| {
                        registry
                            .languages()
                            .into_iter()
                            .find(|&lang| profile.supports(lang))
                    })
                    .ok_or_else(|| RunError::NoCompatibleLanguage {
                        backend: registry.backend().to_string(),
                        options: profile
                            .languages
                            .iter()
                            .map(|l| l.tag())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })?;
                registry.get(lang.tag())?.check_convert()?;
                let platform = self
                    .backends
                    .convert_platform(request.platform.as_ref(), request.backend.as_deref())?;
                let ports = flatten_ports(&request.ports)?;
                (Some(lang), platform, ports)
            }
            None => (None, None, Vec::new()),
        };

        let design = request.design.as_ref().map(|design| Design {
            path: self.cwd.join(&design.path),
            ..design.clone()
        });

        let exported = self.exported_pythonpath();
        let mut search_paths = exported.clone();
        search_paths.push(self.cwd.clone());
        let mut entry = resolve_test_entry(&request.test_module, &search_paths)?;
        if entry.pythonpath.as_ref().is_some_and(|dir| exported.contains(dir)) {
            entry.pythonpath = None;
        }
        let seed = request.seed.unwrap_or_else(|| u64::from(rand::random::<u32>()));
        log::info!(
            "simulator {}, backend {}, conversion language {}, seed {seed}",
            profile.name,
            registry.backend(),
            conversion.map_or("none", HdlLanguage::tag),
        );

        Ok(Plan {
            profile,
            registry,
            toplevel,
            design,
            waveform,
            conversion,
            platform,
            ports,
            entry,
            seed,
        })
    }

    /// The directories the base environment already puts on the Python path.
    fn exported_pythonpath(&self) -> Vec<PathBuf> {
        self.base_env
            .get("PYTHONPATH")
            .map(|p| std::env::split_paths(p).map(|d| self.cwd.join(d)).collect())
            .unwrap_or_default()
    }

    fn stage(
        &self,
        request: &SimulationRequest,
        plan: &Plan,
        staging: &mut StagingDirectory,
    ) -> Result<BTreeMap<HdlLanguage, Vec<PathBuf>>, RunError> {
        let mut sources: BTreeMap<HdlLanguage, Vec<PathBuf>> = request
            .sources
            .iter()
            .map(|(lang, files)| (*lang, files.iter().map(|f| self.cwd.join(f)).collect()))
            .collect();

        let generated = match (&plan.design, plan.conversion) {
            (Some(design), Some(lang)) => {
                let descriptor = plan
                    .registry
                    .get_language(lang)
                    .ok_or_else(|| RunError::UnsupportedLanguage(lang.tag().to_string()))?;
                let name = format!(
                    "{}_output.{}",
                    plan.registry.backend(),
                    descriptor.default_extension
                );
                Some((design, descriptor, name))
            }
            _ => None,
        };

        if let Some(platform) = &request.platform {
            for (name, content) in platform.extra_files() {
                if generated.as_ref().is_some_and(|(_, _, g)| g == name) {
                    return Err(StagingError::Collision { name: name.clone() }.into());
                }
                let path = staging.stage_bytes(name, content.as_bytes())?;
                let ext = Path::new(name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default();
                let lang = plan
                    .registry
                    .language_for_extension(ext, plan.profile.languages)
                    .ok_or_else(|| {
                        RunError::Configuration(format!(
                            "failed to find language for simulator {} that supports file {name}",
                            plan.profile.name
                        ))
                    })?;
                sources.entry(lang).or_default().push(path);
            }
        }

        if let Some((design, descriptor, name)) = generated {
            let text = descriptor.convert(
                design,
                &plan.toplevel,
                &plan.ports,
                plan.platform.as_ref(),
                request.timeout,
            )?;
            let path = staging.stage_generated(&name, text.as_bytes())?;
            sources.entry(descriptor.id).or_default().push(path);
        }

        if sources.values().all(Vec::is_empty) {
            return Err(RunError::NoHdlInput);
        }
        Ok(sources)
    }

    fn execute(
        &self,
        request: &SimulationRequest,
        plan: Plan,
        build_dir: &Path,
        sources: BTreeMap<HdlLanguage, Vec<PathBuf>>,
        sink: &DiagnosticSink,
        result: &mut RunResult,
    ) -> Result<(), EngineError> {
        let runtime = self.toolchains.runtime()?;
        let toolchain = self.toolchains.resolve(&plan.profile, &runtime)?;

        let results_file = results_path(build_dir);
        let pythonpath: Vec<PathBuf> = plan.entry.pythonpath.iter().cloned().collect();
        let env = compute_env(
            &self.base_env,
            &EnvInputs {
                toplevel: &plan.profile.normalize_toplevel(&plan.toplevel),
                test_module: &plan.entry.module,
                seed: plan.seed,
                results_file: &results_file,
                runtime: &runtime,
                pythonpath: &pythonpath,
                extra_env: &request.extra_env,
            },
        );

        let job = SimulationJob {
            toplevel: plan.toplevel,
            build_dir: build_dir.to_path_buf(),
            sources: sources.into_values().flatten().collect(),
            parameters: request.parameters.clone(),
            timescale: request.timescale,
            build_args: request.extra_args.clone(),
            waveform: plan.waveform,
            env,
            timeout: request.timeout,
        };

        let mut adapter = SimulatorAdapter::new(plan.profile, toolchain);
        let outcome = adapter.execute(&job, sink);
        result.waveform = adapter.waveform().cloned();
        outcome
    }
}

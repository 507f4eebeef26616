//! The per-run simulator state machine.
//!
//! ```text
//! Idle --prepare--> Building --build--> Testing --test--> Done
//!                       |                  |
//!                       +-----> Failed <---+
//! ```
//!
//! Transitions happen in order and exactly once; calling a step out of order
//! is an internal error.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hdlrun_common::{InternalError, RunnerResult, Timescale};
use hdlrun_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};

use crate::env::results_path;
use crate::error::EngineError;
use crate::params::ParamValue;
use crate::profile::EngineProfile;
use crate::toolchain::{BuildJob, TestJob, Toolchain};
use crate::waveform::{WaveformManager, WaveformPlan, WaveformRequest};

/// Where a [`SimulatorAdapter`] is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterState {
    /// Nothing has happened yet.
    Idle,
    /// Prepared; the build step is next.
    Building,
    /// Built; the test step is next.
    Testing,
    /// The test step succeeded.
    Done,
    /// The build or test step failed.
    Failed,
}

/// Engine-independent description of one simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationJob {
    /// The toplevel name as requested.
    pub toplevel: String,
    /// The staging directory, used as build and test directory.
    pub build_dir: PathBuf,
    /// All HDL sources, in compilation order.
    pub sources: Vec<PathBuf>,
    /// Top-level parameters or generics.
    pub parameters: BTreeMap<String, ParamValue>,
    /// The timescale.
    pub timescale: Timescale,
    /// Caller-supplied build arguments.
    pub build_args: Vec<String>,
    /// The requested trace, if any.
    pub waveform: Option<WaveformRequest>,
    /// The complete test process environment.
    pub env: BTreeMap<String, String>,
    /// Per-subprocess time limit.
    pub timeout: Option<Duration>,
}

/// A job after the engine profile has been applied.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRun {
    /// The build step.
    pub build: BuildJob,
    /// The test step.
    pub test: TestJob,
    /// The trace plan, if a trace was requested.
    pub waveform: Option<WaveformPlan>,
}

/// Drives one run through build and test using an [`EngineProfile`].
pub struct SimulatorAdapter {
    profile: EngineProfile,
    toolchain: Arc<dyn Toolchain>,
    state: AdapterState,
    waveform: Option<PathBuf>,
}

impl fmt::Debug for SimulatorAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatorAdapter")
            .field("profile", &self.profile.name)
            .field("state", &self.state)
            .finish()
    }
}

impl SimulatorAdapter {
    /// Creates an idle adapter.
    pub fn new(profile: EngineProfile, toolchain: Arc<dyn Toolchain>) -> Self {
        Self {
            profile,
            toolchain,
            state: AdapterState::Idle,
            waveform: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> AdapterState {
        self.state
    }

    /// The profile in use.
    pub fn profile(&self) -> &EngineProfile {
        &self.profile
    }

    /// The trace placed at the caller's destination, once the test step ran.
    pub fn waveform(&self) -> Option<&PathBuf> {
        self.waveform.as_ref()
    }

    fn expect(&self, state: AdapterState, step: &str) -> RunnerResult<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(InternalError::new(format!(
                "cannot {step} a simulator in state {:?}",
                self.state
            )))
        }
    }

    /// Applies the profile to `job`. Moves `Idle` to `Building`.
    pub fn prepare(&mut self, job: &SimulationJob, sink: &DiagnosticSink) -> Result<PreparedRun, EngineError> {
        self.expect(AdapterState::Idle, "prepare")?;
        let profile = &self.profile;
        let toplevel = profile.normalize_toplevel(&job.toplevel);

        let mut build_args = job.build_args.clone();
        build_args.extend(profile.compat_flags.iter().map(|s| s.to_string()));
        build_args.extend(profile.standard_flag.map(String::from));
        build_args.extend(profile.build_flags.iter().map(|s| s.to_string()));

        let mut test_args: Vec<String> = Vec::new();
        if profile.standard_in_test {
            test_args.extend(profile.standard_flag.map(String::from));
        }

        let mut plusargs: Vec<String> = Vec::new();
        let plan = match &job.waveform {
            Some(request) => {
                profile.check_waveform(request.format)?;
                let plan = WaveformPlan::new(profile, request, &toplevel, &job.build_dir);
                if plan.degraded {
                    sink.emit(
                        Diagnostic::warning(
                            DiagnosticCode::WAVEFORM_DEGRADED,
                            format!(
                                "{} cannot trace .{} directly; the waveform may be missing",
                                profile.name, request.format
                            ),
                        )
                        .with_path(&request.destination)
                        .with_help("request a .fst waveform instead"),
                    );
                }
                build_args.extend(plan.trace_flags.iter().cloned());
                if profile.trace_in_test {
                    test_args.extend(plan.trace_flags.iter().cloned());
                }
                plusargs.extend(plan.plusargs.iter().cloned());
                Some(plan)
            }
            None => None,
        };
        plusargs.extend(profile.plusargs.iter().map(|s| s.to_string()));

        let waveform_path = plan.as_ref().map(|p| p.intermediate.clone());
        let prepared = PreparedRun {
            build: BuildJob {
                toplevel: toplevel.clone(),
                build_dir: job.build_dir.clone(),
                sources: job.sources.clone(),
                build_args,
                parameters: job.parameters.clone(),
                timescale: job.timescale,
                waves: plan.as_ref().is_some_and(|p| p.build_waves),
                waveform_path: waveform_path.clone(),
                timeout: job.timeout,
            },
            test: TestJob {
                toplevel,
                build_dir: job.build_dir.clone(),
                test_args,
                plusargs,
                parameters: job.parameters.clone(),
                waves: plan.as_ref().is_some_and(|p| p.test_waves),
                waveform_format: plan.as_ref().map(|p| p.request.format),
                waveform_path,
                env: job.env.clone(),
                results_file: results_path(&job.build_dir),
                timeout: job.timeout,
            },
            waveform: plan,
        };
        log::debug!("prepared {} run: {:?}", self.profile.name, prepared.build.build_args);
        self.state = AdapterState::Building;
        Ok(prepared)
    }

    /// Runs the build step. Moves `Building` to `Testing` or `Failed`.
    pub fn build(&mut self, run: &PreparedRun, sink: &DiagnosticSink) -> Result<(), EngineError> {
        self.expect(AdapterState::Building, "build")?;
        match self.toolchain.build(&run.build) {
            Ok(()) => {
                self.state = AdapterState::Testing;
                Ok(())
            }
            Err(e) => {
                self.state = AdapterState::Failed;
                sink.emit(Diagnostic::error(DiagnosticCode::BUILD_FAILED, e.to_string()));
                Err(e)
            }
        }
    }

    /// Runs the test step, then reconciles the waveform whatever the outcome.
    /// Moves `Testing` to `Done` or `Failed`.
    pub fn test(&mut self, run: &PreparedRun, sink: &DiagnosticSink) -> Result<(), EngineError> {
        self.expect(AdapterState::Testing, "test")?;
        let outcome = self.toolchain.test(&run.test);

        if let Some(plan) = &run.waveform {
            self.waveform =
                WaveformManager::reconcile(&plan.intermediate, &plan.request.destination, sink);
        }

        match outcome {
            Ok(()) => {
                self.state = AdapterState::Done;
                Ok(())
            }
            Err(e) => {
                self.state = AdapterState::Failed;
                sink.emit(Diagnostic::error(DiagnosticCode::TEST_FAILED, e.to_string()));
                Err(e)
            }
        }
    }

    /// Prepares, builds and tests in one go.
    pub fn execute(&mut self, job: &SimulationJob, sink: &DiagnosticSink) -> Result<(), EngineError> {
        let run = self.prepare(job, sink)?;
        self.build(&run, sink)?;
        self.test(&run, sink)
    }
}

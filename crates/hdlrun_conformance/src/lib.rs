//! Conformance test helpers for hdlrun.
//!
//! Provides an in-process elaborator and toolchain that record every call
//! they receive, so integration tests can drive a [`RunCoordinator`] end to
//! end and assert on what was converted, staged, built and tested (and in
//! which order) without any simulator installed.

#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use hdlrun_engine::{BuildJob, EngineError, TestJob, TestRuntime, Toolchain, ToolchainSet};
use hdlrun_lang::{Backend, BackendAdapter, ConvertRequest, Design, Elaborator, LangError};
use hdlrun_runner::{RunCoordinator, SimulationRequest};

/// Engines the harness registers its recording toolchain for.
pub const ENGINES: [&str; 4] = ["icarus", "verilator", "ghdl", "nvc"];

/// One call observed by the harness, in the order it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A design was converted into the named language.
    Convert(String),
    /// A build step ran; carries the file names present in the build directory.
    Build(Vec<String>),
    /// A test step ran.
    Test,
}

type EventLog = Arc<Mutex<Vec<Event>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A deterministic elaborator rendering an empty module with the requested ports.
pub struct RecordingElaborator {
    events: EventLog,
}

impl Elaborator for RecordingElaborator {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<String, LangError> {
        lock(&self.events).push(Event::Convert(request.language.tag().to_string()));
        let ports: Vec<String> = request
            .ports
            .iter()
            .map(|p| format!("  // port {} [{}]", p.name, p.width))
            .collect();
        let args: Vec<String> = request
            .design
            .args
            .iter()
            .map(|(k, v)| format!("// arg {k}={v}"))
            .collect();
        Ok(format!(
            "// generated from {}\n{}\nmodule {} ();\n{}\nendmodule\n",
            request.design.path.display(),
            args.join("\n"),
            request.name,
            ports.join("\n"),
        ))
    }
}

/// How the recording toolchain behaves.
#[derive(Clone, Debug, Default)]
pub struct ToolchainBehavior {
    /// Write a trace to the job's waveform path during the test step.
    pub write_trace: bool,
    /// Fail the build step with this message.
    pub fail_build: Option<String>,
    /// Fail the test step with this message.
    pub fail_test: Option<String>,
}

/// A toolchain that records jobs instead of running a simulator.
pub struct RecordingToolchain {
    behavior: ToolchainBehavior,
    events: EventLog,
    builds: Mutex<Vec<BuildJob>>,
    tests: Mutex<Vec<TestJob>>,
}

impl Toolchain for RecordingToolchain {
    fn build(&self, job: &BuildJob) -> Result<(), EngineError> {
        let mut present: Vec<String> = fs::read_dir(&job.build_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        present.sort();
        lock(&self.events).push(Event::Build(present));
        lock(&self.builds).push(job.clone());
        match &self.behavior.fail_build {
            Some(message) => Err(EngineError::Build {
                command: "fake-build".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn test(&self, job: &TestJob) -> Result<(), EngineError> {
        lock(&self.events).push(Event::Test);
        lock(&self.tests).push(job.clone());
        if self.behavior.write_trace {
            if let Some(path) = &job.waveform_path {
                fs::write(path, format!("trace of {}\n", job.toplevel))?;
            }
        }
        match &self.behavior.fail_test {
            Some(message) => Err(EngineError::Test {
                command: "fake-test".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// A coordinator wired to recording fakes, plus everything they observed.
pub struct Harness {
    /// The directory relative request paths resolve against.
    pub cwd: PathBuf,
    /// The coordinator under test.
    pub coordinator: RunCoordinator,
    events: EventLog,
    toolchain: Arc<RecordingToolchain>,
}

impl Harness {
    /// Creates a harness rooted at `cwd` whose toolchain succeeds without writing traces.
    pub fn new(cwd: &Path) -> Self {
        Self::with_behavior(cwd, ToolchainBehavior::default())
    }

    /// Creates a harness rooted at `cwd` with the given toolchain behavior.
    pub fn with_behavior(cwd: &Path, behavior: ToolchainBehavior) -> Self {
        let events = EventLog::default();
        let elaborator = Arc::new(RecordingElaborator {
            events: events.clone(),
        });
        let toolchain = Arc::new(RecordingToolchain {
            behavior,
            events: events.clone(),
            builds: Mutex::new(Vec::new()),
            tests: Mutex::new(Vec::new()),
        });

        let mut backends = BackendAdapter::new();
        for backend in Backend::ALL {
            backends = backends.with_elaborator(backend, elaborator.clone());
        }
        let mut toolchains = ToolchainSet::new().with_runtime(runtime());
        for engine in ENGINES {
            toolchains = toolchains.with_toolchain(engine, toolchain.clone());
        }

        Self {
            cwd: cwd.to_path_buf(),
            coordinator: RunCoordinator::new(backends, toolchains, cwd)
                .with_base_env(BTreeMap::new()),
            events,
            toolchain,
        }
    }

    /// Every call observed so far, in order.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    /// The number of conversions performed.
    pub fn conversions(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Convert(_)))
            .count()
    }

    /// The build jobs received.
    pub fn builds(&self) -> Vec<BuildJob> {
        lock(&self.toolchain.builds).clone()
    }

    /// The test jobs received.
    pub fn tests(&self) -> Vec<TestJob> {
        lock(&self.toolchain.tests).clone()
    }

    /// Returns `true` if nothing was converted, built or tested.
    pub fn untouched(&self) -> bool {
        self.events().is_empty()
    }
}

/// A fixed test runtime with no Python library.
pub fn runtime() -> TestRuntime {
    TestRuntime {
        lib_dir: "/opt/cocotb/libs".into(),
        share_dir: "/opt/cocotb/share".into(),
        libpython: None,
        python_bin: "/usr/bin/python3".into(),
    }
}

/// A request converting `adder.py` and running `test_adder`.
pub fn design_request() -> SimulationRequest {
    SimulationRequest {
        design: Some(Design::new("adder.py")),
        ..SimulationRequest::new("test_adder")
    }
}

/// A request building `files` as Verilog with toplevel `top` and no design.
pub fn verilog_request(files: &[&str]) -> SimulationRequest {
    SimulationRequest {
        toplevel: Some("top".to_string()),
        ..SimulationRequest::new("test_top")
    }
    .with_sources(hdlrun_common::HdlLanguage::Verilog, files.iter().copied())
}

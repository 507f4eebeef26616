//! Simulation engines for hdlrun.
//!
//! Every supported simulator is described by an [`EngineProfile`]: which
//! languages it accepts, which flags it needs, where it leaves its waveform
//! trace. A single [`SimulatorAdapter`] consumes a profile and drives one run
//! through build and test, delegating the actual subprocesses to a
//! [`Toolchain`]. [`CommandToolchain`] knows the command lines of the four
//! built-in simulators; [`TemplateToolchain`] runs user-configured commands
//! for anything else.
//!
//! The environment handed to the test process is computed by the pure
//! [`compute_env`], and [`WaveformManager`] moves the produced trace to where
//! the caller asked for it.

#![warn(missing_docs)]

pub mod adapter;
pub mod env;
pub mod error;
pub mod params;
pub mod process;
pub mod profile;
pub mod runtime;
pub mod toolchain;
pub mod waveform;

pub use adapter::{AdapterState, PreparedRun, SimulationJob, SimulatorAdapter};
pub use env::{compute_env, results_path, EnvInputs};
pub use error::EngineError;
pub use params::ParamValue;
pub use process::{run_command, CommandOutput, CommandSpec};
pub use profile::{lookup_profile, EngineProfile, ToplevelCase, TraceFlag, WaveformRule, PROFILES};
pub use runtime::{RuntimeOverrides, TestRuntime};
pub use toolchain::{
    BuildJob, CommandToolchain, TemplateToolchain, TestJob, Toolchain, ToolchainSet,
};
pub use waveform::{WaveformManager, WaveformPlan, WaveformRequest};

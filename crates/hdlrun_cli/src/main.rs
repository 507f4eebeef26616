//! hdlrun CLI: the command-line front end for running HDL tests.
//!
//! Provides `hdlrun run` for running one configured (or fully flag-driven)
//! simulation, `hdlrun engines` for listing the simulators hdlrun knows how
//! to drive, and `hdlrun check` for validating run profiles without staging
//! or running anything.

#![warn(missing_docs)]

mod check;
mod engines;
mod logging;
mod project;
mod run;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use hdlrun_common::Timescale;
use hdlrun_engine::ParamValue;

/// hdlrun: run cocotb-style HDL tests against any supported simulator.
#[derive(Parser, Debug)]
#[command(name = "hdlrun", version, about = "HDL test runner")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `hdlrun.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation.
    Run(RunArgs),
    /// List the simulators hdlrun can drive.
    Engines,
    /// Validate run profiles without running them.
    Check(CheckArgs),
}

/// Arguments for the `hdlrun run` subcommand.
///
/// Every flag overrides the matching setting of the selected run profile.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Run profile to select from `[runs.<name>]` in `hdlrun.toml`.
    pub name: Option<String>,

    /// Simulation engine (e.g. `icarus`, `verilator`, `ghdl`, `nvc`).
    #[arg(short, long)]
    pub engine: Option<String>,

    /// HDL language to convert the design into.
    #[arg(short, long)]
    pub language: Option<String>,

    /// Elaboration backend (`amaranth` or `celosia`).
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Toplevel module/entity name.
    #[arg(short, long)]
    pub toplevel: Option<String>,

    /// Test module name or test file path.
    #[arg(short = 'm', long)]
    pub test_module: Option<String>,

    /// Verilog source files.
    #[arg(long = "verilog", value_name = "FILE", num_args = 1..)]
    pub verilog: Vec<PathBuf>,

    /// VHDL source files.
    #[arg(long = "vhdl", value_name = "FILE", num_args = 1..)]
    pub vhdl: Vec<PathBuf>,

    /// Structural design file to convert into HDL.
    #[arg(long)]
    pub design: Option<PathBuf>,

    /// Object within the design file to instantiate.
    #[arg(long, requires = "design")]
    pub entry: Option<String>,

    /// Toplevel parameter or generic (repeatable).
    #[arg(short = 'P', long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, ParamValue)>,

    /// Random seed passed to the test runtime.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Extra environment variable for the test process (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// Extra build argument (repeatable).
    #[arg(long = "extra-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub extra_args: Vec<String>,

    /// Waveform destination (`.vcd` or `.fst`).
    #[arg(short, long)]
    pub waveform: Option<PathBuf>,

    /// Timescale as `unit/precision` (e.g. `1ns/1ps`).
    #[arg(long, value_parser = parse_timescale)]
    pub timescale: Option<Timescale>,

    /// Persistent working directory; a temporary one is used otherwise.
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Per-subprocess time limit in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the `hdlrun check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Run profile to check; `[run]` and every named profile otherwise.
    pub name: Option<String>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn parse_param(s: &str) -> Result<(String, ParamValue), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let value = match value {
        "true" => ParamValue::Bool(true),
        "false" => ParamValue::Bool(false),
        v => v
            .parse::<i64>()
            .map_or_else(|_| ParamValue::Text(v.to_string()), ParamValue::Int),
    };
    Ok((name.to_string(), value))
}

fn parse_env(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

fn parse_timescale(s: &str) -> Result<Timescale, String> {
    s.parse().map_err(|e: hdlrun_common::ParseTimescaleError| e.to_string())
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    if let Err(e) = logging::init(&global) {
        eprintln!("error: {e}");
        process::exit(1);
    }

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::Engines => engines::run(&global),
        Command::Check(ref args) => check::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

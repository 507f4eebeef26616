//! Build/test toolchains: the subprocess side of a simulation.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hdlrun_common::{HdlLanguage, Timescale, WaveformFormat};

use crate::error::EngineError;
use crate::params::{sv_literal, ParamValue};
use crate::process::{run_command, CommandSpec};
use crate::profile::EngineProfile;
use crate::runtime::{RuntimeOverrides, TestRuntime};

/// Everything the build step needs.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildJob {
    /// The engine-normalized toplevel name.
    pub toplevel: String,
    /// The directory build artifacts go to.
    pub build_dir: PathBuf,
    /// All HDL sources, in compilation order.
    pub sources: Vec<PathBuf>,
    /// Build arguments after profile mutations.
    pub build_args: Vec<String>,
    /// Top-level parameters or generics.
    pub parameters: BTreeMap<String, ParamValue>,
    /// The timescale.
    pub timescale: Timescale,
    /// Whether tracing is compiled in.
    pub waves: bool,
    /// Where the engine will leave the trace, if tracing.
    pub waveform_path: Option<PathBuf>,
    /// Per-subprocess time limit.
    pub timeout: Option<Duration>,
}

/// Everything the test step needs.
#[derive(Clone, Debug, PartialEq)]
pub struct TestJob {
    /// The engine-normalized toplevel name.
    pub toplevel: String,
    /// The directory holding the build artifacts; also the working directory.
    pub build_dir: PathBuf,
    /// Test arguments after profile mutations.
    pub test_args: Vec<String>,
    /// Plusargs after profile mutations.
    pub plusargs: Vec<String>,
    /// Top-level parameters or generics.
    pub parameters: BTreeMap<String, ParamValue>,
    /// Whether tracing is enabled at run time.
    pub waves: bool,
    /// The requested trace format, if any.
    pub waveform_format: Option<WaveformFormat>,
    /// Where the engine will leave the trace, if any.
    pub waveform_path: Option<PathBuf>,
    /// The complete test process environment.
    pub env: BTreeMap<String, String>,
    /// Where the test runtime reports results.
    pub results_file: PathBuf,
    /// Per-subprocess time limit.
    pub timeout: Option<Duration>,
}

/// Runs an engine's build and test steps.
///
/// Abnormal outcomes are returned as errors; implementations never panic on
/// a failing simulator.
pub trait Toolchain: Send + Sync {
    /// Runs the build step.
    fn build(&self, job: &BuildJob) -> Result<(), EngineError>;

    /// Runs the test step.
    fn test(&self, job: &TestJob) -> Result<(), EngineError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Builtin {
    Icarus,
    Verilator,
    Ghdl,
    Nvc,
}

const ICARUS_DUMP_MODULE: &str = "hdlrun_iverilog_dump";

/// The command lines of the built-in simulators.
#[derive(Clone, Debug)]
pub struct CommandToolchain {
    engine: Builtin,
    runtime: TestRuntime,
}

impl CommandToolchain {
    /// Returns the toolchain for a built-in engine name.
    pub fn for_engine(name: &str, runtime: TestRuntime) -> Option<Self> {
        let engine = match name {
            "icarus" => Builtin::Icarus,
            "verilator" => Builtin::Verilator,
            "ghdl" => Builtin::Ghdl,
            "nvc" => Builtin::Nvc,
            _ => return None,
        };
        Some(Self { engine, runtime })
    }

    fn language(&self) -> HdlLanguage {
        match self.engine {
            Builtin::Icarus | Builtin::Verilator => HdlLanguage::Verilog,
            Builtin::Ghdl | Builtin::Nvc => HdlLanguage::Vhdl,
        }
    }

    fn libs(&self) -> &Path {
        &self.runtime.lib_dir
    }

    fn parameter_args(&self, job_toplevel: &str, params: &BTreeMap<String, ParamValue>) -> Vec<String> {
        let lang = self.language();
        params
            .iter()
            .map(|(name, value)| {
                let value = value.render(lang);
                match self.engine {
                    Builtin::Icarus => format!("-P{job_toplevel}.{name}={value}"),
                    Builtin::Verilator => format!("-G{name}={value}"),
                    Builtin::Ghdl | Builtin::Nvc => format!("-g{name}={value}"),
                }
            })
            .collect()
    }

    fn icarus_cmds_file(job: &BuildJob) -> PathBuf {
        job.build_dir.join("cmds.f")
    }

    fn icarus_dump_file(job: &BuildJob) -> PathBuf {
        job.build_dir.join(format!("{ICARUS_DUMP_MODULE}.v"))
    }

    /// Writes the auxiliary files the build commands refer to.
    pub fn write_support_files(&self, job: &BuildJob) -> io::Result<()> {
        if self.engine != Builtin::Icarus {
            return Ok(());
        }
        fs::create_dir_all(&job.build_dir)?;
        fs::write(
            Self::icarus_cmds_file(job),
            format!(
                "+timescale+{}/{}\n",
                job.timescale.unit, job.timescale.precision
            ),
        )?;
        if job.waves {
            if let Some(path) = &job.waveform_path {
                let module = format!(
                    "module {ICARUS_DUMP_MODULE}();\ninitial begin\n    $dumpfile({});\n    $dumpvars(0, {});\nend\nendmodule\n",
                    sv_literal(&path.to_string_lossy()),
                    job.toplevel
                );
                fs::write(Self::icarus_dump_file(job), module)?;
            }
        }
        Ok(())
    }

    /// The build command lines, in execution order.
    pub fn build_commands(&self, job: &BuildJob) -> Vec<CommandSpec> {
        let dir = job.build_dir.display().to_string();
        let sources = job.sources.iter().map(|s| s.display().to_string());
        let params = self.parameter_args(&job.toplevel, &job.parameters);
        let libs = self.libs().display().to_string();

        match self.engine {
            Builtin::Icarus => {
                let dump = job.waves && job.waveform_path.is_some();
                let mut cmd = CommandSpec::new("iverilog")
                    .arg("-o")
                    .arg(format!("{dir}/sim.vvp"))
                    .arg("-s")
                    .arg(&job.toplevel);
                if dump {
                    cmd = cmd.arg("-s").arg(ICARUS_DUMP_MODULE);
                }
                cmd = cmd
                    .arg("-f")
                    .arg(Self::icarus_cmds_file(job).display().to_string())
                    .arg("-g2012")
                    .args(params)
                    .args(job.build_args.iter().cloned())
                    .args(sources);
                if dump {
                    cmd = cmd.arg(Self::icarus_dump_file(job).display().to_string());
                }
                vec![cmd]
            }
            Builtin::Verilator => {
                let verilator_cpp = self
                    .runtime
                    .share_dir
                    .join("lib")
                    .join("verilator")
                    .join("verilator.cpp");
                let mut cmd = CommandSpec::new("verilator")
                    .args(["-cc", "--exe", "-Mdir"])
                    .arg(&dir)
                    .arg("-DCOCOTB_SIM=1")
                    .arg("--top-module")
                    .arg(&job.toplevel)
                    .args(["--vpi", "--public-flat-rw", "--prefix", "Vtop", "-o"])
                    .arg(&job.toplevel)
                    .arg("-LDFLAGS")
                    .arg(format!(
                        "-Wl,-rpath,{libs} -L{libs} -lcocotbvpi_verilator"
                    ));
                if job.waves {
                    cmd = cmd.arg("--trace");
                }
                cmd = cmd
                    .arg("--timescale")
                    .arg(job.timescale.to_string())
                    .args(params)
                    .args(job.build_args.iter().cloned())
                    .arg(verilator_cpp.display().to_string())
                    .args(sources);
                let make = CommandSpec::new("make").args(["-C", dir.as_str(), "-f", "Vtop.mk"]);
                vec![cmd, make]
            }
            Builtin::Ghdl => {
                let work = ["--work=top".to_string(), format!("--workdir={dir}")];
                let import = CommandSpec::new("ghdl")
                    .arg("-i")
                    .args(job.build_args.iter().cloned())
                    .args(work.clone())
                    .args(sources);
                let make = CommandSpec::new("ghdl")
                    .arg("-m")
                    .args(job.build_args.iter().cloned())
                    .args(work)
                    .arg(&job.toplevel);
                vec![import, make]
            }
            Builtin::Nvc => {
                let analyse = CommandSpec::new("nvc")
                    .arg(format!("--work=top:{dir}/top"))
                    .args(job.build_args.iter().cloned())
                    .arg("-a")
                    .args(sources);
                vec![analyse]
            }
        }
    }

    /// The test command line.
    pub fn test_command(&self, job: &TestJob) -> CommandSpec {
        let dir = job.build_dir.display().to_string();
        let libs = self.libs().display().to_string();
        let params = self.parameter_args(&job.toplevel, &job.parameters);

        let cmd = match self.engine {
            Builtin::Icarus => {
                let mut cmd = CommandSpec::new("vvp")
                    .arg("-M")
                    .arg(&libs)
                    .args(["-m", "libcocotbvpi_icarus"])
                    .args(job.test_args.iter().cloned())
                    .arg(format!("{dir}/sim.vvp"));
                if job.waves && job.waveform_format == Some(WaveformFormat::Fst) {
                    cmd = cmd.arg("-fst");
                }
                cmd.args(job.plusargs.iter().cloned())
            }
            Builtin::Verilator => CommandSpec::new(format!("{dir}/{}", job.toplevel))
                .args(job.test_args.iter().cloned())
                .args(job.plusargs.iter().cloned()),
            Builtin::Ghdl => CommandSpec::new("ghdl")
                .arg("-r")
                .args(job.test_args.iter().cloned())
                .arg("--work=top")
                .arg(format!("--workdir={dir}"))
                .arg(&job.toplevel)
                .arg(format!("--vpi={libs}/libcocotbvpi_ghdl.so"))
                .args(params)
                .args(job.plusargs.iter().cloned()),
            Builtin::Nvc => CommandSpec::new("nvc")
                .arg(format!("--work=top:{dir}/top"))
                .args(job.test_args.iter().cloned())
                .args(["-e", "--no-save", "--jit"])
                .args(params)
                .arg(&job.toplevel)
                .arg("-r")
                .arg(format!("--load={libs}/libcocotbvpi_nvc.so"))
                .args(job.plusargs.iter().cloned()),
        };
        cmd.current_dir(&job.build_dir).env(job.env.clone())
    }
}

impl Toolchain for CommandToolchain {
    fn build(&self, job: &BuildJob) -> Result<(), EngineError> {
        self.write_support_files(job)?;
        for cmd in self.build_commands(job) {
            run_build_step(&cmd, job.timeout)?;
        }
        Ok(())
    }

    fn test(&self, job: &TestJob) -> Result<(), EngineError> {
        run_test_step(&self.test_command(job), job)
    }
}

/// A toolchain assembled from user-configured command templates.
///
/// Arguments equal to `{sources}`, `{build_args}`, `{test_args}` or
/// `{plusargs}` expand into zero or more arguments. `{toplevel}`,
/// `{build_dir}`, `{waveform}` and `{results_file}` are substituted inside
/// any argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateToolchain {
    build: Vec<Vec<String>>,
    test: Vec<String>,
}

impl TemplateToolchain {
    /// Creates a template toolchain for `engine`. The test template must not
    /// be empty; build templates that are empty are skipped.
    pub fn new(engine: &str, build: Vec<Vec<String>>, test: Vec<String>) -> Result<Self, EngineError> {
        if test.is_empty() {
            return Err(EngineError::NoToolchain(engine.to_string()));
        }
        Ok(Self { build, test })
    }

    fn expand(template: &[String], scalars: &[(&str, String)], lists: &[(&str, &[String])]) -> Option<CommandSpec> {
        let mut words: Vec<String> = Vec::new();
        for arg in template {
            if let Some((_, items)) = lists.iter().find(|(key, _)| arg == key) {
                words.extend(items.iter().cloned());
                continue;
            }
            let mut word = arg.clone();
            for (key, value) in scalars {
                word = word.replace(key, value);
            }
            words.push(word);
        }
        let (program, args) = words.split_first()?;
        Some(CommandSpec::new(program.clone()).args(args.iter().cloned()))
    }

    /// The build command lines, in execution order.
    pub fn build_commands(&self, job: &BuildJob) -> Vec<CommandSpec> {
        let sources: Vec<String> = job.sources.iter().map(|s| s.display().to_string()).collect();
        let scalars = [
            ("{toplevel}", job.toplevel.clone()),
            ("{build_dir}", job.build_dir.display().to_string()),
            ("{waveform}", display_opt(&job.waveform_path)),
        ];
        let lists: [(&str, &[String]); 2] = [("{sources}", &sources), ("{build_args}", &job.build_args)];
        self.build
            .iter()
            .filter_map(|t| Self::expand(t, &scalars, &lists))
            .collect()
    }

    /// The test command line.
    pub fn test_command(&self, job: &TestJob) -> Option<CommandSpec> {
        let scalars = [
            ("{toplevel}", job.toplevel.clone()),
            ("{build_dir}", job.build_dir.display().to_string()),
            ("{waveform}", display_opt(&job.waveform_path)),
            ("{results_file}", job.results_file.display().to_string()),
        ];
        let lists: [(&str, &[String]); 2] = [("{test_args}", &job.test_args), ("{plusargs}", &job.plusargs)];
        Self::expand(&self.test, &scalars, &lists)
            .map(|cmd| cmd.current_dir(&job.build_dir).env(job.env.clone()))
    }
}

fn display_opt(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

impl Toolchain for TemplateToolchain {
    fn build(&self, job: &BuildJob) -> Result<(), EngineError> {
        if !job.parameters.is_empty() {
            log::warn!("parameters are not passed to template toolchains");
        }
        fs::create_dir_all(&job.build_dir)?;
        for cmd in self.build_commands(job) {
            run_build_step(&cmd, job.timeout)?;
        }
        Ok(())
    }

    fn test(&self, job: &TestJob) -> Result<(), EngineError> {
        let cmd = self.test_command(job).ok_or_else(|| EngineError::Test {
            command: String::new(),
            message: "test command template expanded to nothing".to_string(),
        })?;
        run_test_step(&cmd, job)
    }
}

fn run_build_step(cmd: &CommandSpec, timeout: Option<Duration>) -> Result<(), EngineError> {
    let output = run_command(cmd, timeout)?;
    if output.status.success() {
        Ok(())
    } else {
        Err(EngineError::Build {
            command: cmd.to_string(),
            message: output.failure_message(),
        })
    }
}

fn run_test_step(cmd: &CommandSpec, job: &TestJob) -> Result<(), EngineError> {
    match fs::remove_file(&job.results_file) {
        Ok(()) => log::debug!("removed stale {}", job.results_file.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    let output = run_command(cmd, job.timeout)?;
    if !output.status.success() {
        return Err(EngineError::Test {
            command: cmd.to_string(),
            message: output.failure_message(),
        });
    }
    check_results(&job.results_file, &cmd.to_string())
}

/// Checks a test runtime results file for failing or erroring tests.
pub fn check_results(path: &Path, command: &str) -> Result<(), EngineError> {
    let text = fs::read_to_string(path).map_err(|e| EngineError::Test {
        command: command.to_string(),
        message: format!("no results in {}: {e}", path.display()),
    })?;
    let failed = text.matches("<failure").count() + text.matches("<error").count();
    if failed > 0 {
        return Err(EngineError::Test {
            command: command.to_string(),
            message: format!("{failed} failing test(s) reported in {}", path.display()),
        });
    }
    Ok(())
}

/// The toolchains available to a coordinator, keyed by engine name.
///
/// Resolution prefers an explicitly registered toolchain, then a configured
/// template, then the built-in command lines.
#[derive(Clone, Default)]
pub struct ToolchainSet {
    runtime: Option<TestRuntime>,
    runtime_overrides: RuntimeOverrides,
    templates: BTreeMap<String, TemplateToolchain>,
    custom: BTreeMap<String, Arc<dyn Toolchain>>,
}

impl fmt::Debug for ToolchainSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolchainSet")
            .field("runtime", &self.runtime)
            .field("runtime_overrides", &self.runtime_overrides)
            .field("templates", &self.templates)
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolchainSet {
    /// Creates a set with only the built-in toolchains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed runtime instead of discovering one.
    pub fn with_runtime(mut self, runtime: TestRuntime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Sets the locations used when discovering the runtime.
    pub fn with_runtime_overrides(mut self, overrides: RuntimeOverrides) -> Self {
        self.runtime_overrides = overrides;
        self
    }

    /// Registers a template toolchain for `engine`.
    pub fn with_template(mut self, engine: impl Into<String>, template: TemplateToolchain) -> Self {
        self.templates.insert(engine.into(), template);
        self
    }

    /// Registers an arbitrary toolchain for `engine`.
    pub fn with_toolchain(mut self, engine: impl Into<String>, toolchain: Arc<dyn Toolchain>) -> Self {
        self.custom.insert(engine.into(), toolchain);
        self
    }

    /// Returns true if a toolchain is registered or configured for `engine`.
    pub fn has_configured(&self, engine: &str) -> bool {
        self.custom.contains_key(engine) || self.templates.contains_key(engine)
    }

    /// The fixed runtime, or a freshly discovered one.
    pub fn runtime(&self) -> Result<TestRuntime, EngineError> {
        match &self.runtime {
            Some(runtime) => Ok(runtime.clone()),
            None => TestRuntime::discover(&self.runtime_overrides),
        }
    }

    /// Picks the toolchain for `profile`.
    pub fn resolve(&self, profile: &EngineProfile, runtime: &TestRuntime) -> Result<Arc<dyn Toolchain>, EngineError> {
        let name = profile.name.as_ref();
        if let Some(toolchain) = self.custom.get(name) {
            return Ok(Arc::clone(toolchain));
        }
        if let Some(template) = self.templates.get(name) {
            return Ok(Arc::new(template.clone()));
        }
        CommandToolchain::for_engine(name, runtime.clone())
            .map(|t| Arc::new(t) as Arc<dyn Toolchain>)
            .ok_or_else(|| EngineError::NoToolchain(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::lookup_profile;

    fn runtime() -> TestRuntime {
        TestRuntime {
            lib_dir: "/rt/libs".into(),
            share_dir: "/rt/share".into(),
            libpython: None,
            python_bin: "/usr/bin/python3".into(),
        }
    }

    fn build_job(toplevel: &str) -> BuildJob {
        BuildJob {
            toplevel: toplevel.into(),
            build_dir: "/b".into(),
            sources: vec!["/s/a.v".into(), "/s/b.v".into()],
            build_args: vec!["-g2005".into()],
            parameters: BTreeMap::from([("WIDTH".to_string(), ParamValue::Int(8))]),
            timescale: Timescale::default(),
            waves: false,
            waveform_path: None,
            timeout: None,
        }
    }

    fn test_job(toplevel: &str) -> TestJob {
        TestJob {
            toplevel: toplevel.into(),
            build_dir: "/b".into(),
            test_args: vec![],
            plusargs: vec![],
            parameters: BTreeMap::new(),
            waves: false,
            waveform_format: None,
            waveform_path: None,
            env: BTreeMap::new(),
            results_file: "/b/results.xml".into(),
            timeout: None,
        }
    }

    fn toolchain(name: &str) -> CommandToolchain {
        CommandToolchain::for_engine(name, runtime()).unwrap()
    }

    #[test]
    fn icarus_build_line() {
        let cmds = toolchain("icarus").build_commands(&build_job("adder"));
        assert_eq!(cmds.len(), 1);
        assert_eq!(
            cmds[0].to_string(),
            "iverilog -o /b/sim.vvp -s adder -f /b/cmds.f -g2012 -Padder.WIDTH=8 -g2005 /s/a.v /s/b.v"
        );
    }

    #[test]
    fn icarus_build_line_with_dump() {
        let mut job = build_job("adder");
        job.waves = true;
        job.waveform_path = Some("/b/adder.fst".into());
        let cmd = &toolchain("icarus").build_commands(&job)[0];
        assert_eq!(cmd.args[4..6], ["-s", ICARUS_DUMP_MODULE]);
        assert_eq!(cmd.args.last().unwrap(), "/b/hdlrun_iverilog_dump.v");
    }

    #[test]
    fn icarus_support_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = build_job("adder");
        job.build_dir = dir.path().to_path_buf();
        job.waves = true;
        job.waveform_path = Some(dir.path().join("adder.fst"));
        toolchain("icarus").write_support_files(&job).unwrap();

        let cmds = fs::read_to_string(dir.path().join("cmds.f")).unwrap();
        assert_eq!(cmds, "+timescale+1ns/1ps\n");
        let dump = fs::read_to_string(dir.path().join("hdlrun_iverilog_dump.v")).unwrap();
        assert!(dump.starts_with("module hdlrun_iverilog_dump();"));
        assert!(dump.contains("$dumpvars(0, adder);"));
        assert!(dump.contains("adder.fst\");"));
    }

    #[test]
    fn icarus_test_line() {
        let mut job = test_job("adder");
        job.waves = true;
        job.waveform_format = Some(WaveformFormat::Fst);
        let cmd = toolchain("icarus").test_command(&job);
        assert_eq!(
            cmd.to_string(),
            "vvp -M /rt/libs -m libcocotbvpi_icarus /b/sim.vvp -fst"
        );
        assert_eq!(cmd.cwd, Some(PathBuf::from("/b")));

        job.waves = false;
        job.waveform_format = Some(WaveformFormat::Vcd);
        job.plusargs = vec!["-vcd".into()];
        let cmd = toolchain("icarus").test_command(&job);
        assert_eq!(cmd.args.last().unwrap(), "-vcd");
        assert!(!cmd.args.contains(&"-fst".to_string()));
    }

    #[test]
    fn verilator_build_lines() {
        let mut job = build_job("adder");
        job.waves = true;
        let cmds = toolchain("verilator").build_commands(&job);
        assert_eq!(cmds.len(), 2);
        let args = &cmds[0].args;
        assert!(args.contains(&"--trace".to_string()));
        assert!(args.contains(&"-GWIDTH=8".to_string()));
        assert!(args.contains(&"-Wl,-rpath,/rt/libs -L/rt/libs -lcocotbvpi_verilator".to_string()));
        assert!(args.contains(&"/rt/share/lib/verilator/verilator.cpp".to_string()));
        assert_eq!(cmds[1].to_string(), "make -C /b -f Vtop.mk");
    }

    #[test]
    fn ghdl_lines() {
        let mut job = build_job("adder");
        job.build_args = vec!["--std=08".into()];
        let cmds = toolchain("ghdl").build_commands(&job);
        assert_eq!(
            cmds[0].to_string(),
            "ghdl -i --std=08 --work=top --workdir=/b /s/a.v /s/b.v"
        );
        assert_eq!(cmds[1].to_string(), "ghdl -m --std=08 --work=top --workdir=/b adder");

        let mut test = test_job("adder");
        test.parameters.insert("WIDTH".into(), ParamValue::Int(4));
        test.plusargs = vec!["--vcd=/w/out.vcd".into()];
        assert_eq!(
            toolchain("ghdl").test_command(&test).to_string(),
            "ghdl -r --work=top --workdir=/b adder --vpi=/rt/libs/libcocotbvpi_ghdl.so -gWIDTH=4 --vcd=/w/out.vcd"
        );
    }

    #[test]
    fn nvc_lines() {
        let cmds = toolchain("nvc").build_commands(&build_job("adder"));
        assert_eq!(cmds.len(), 1);
        assert!(cmds[0].to_string().starts_with("nvc --work=top:/b/top -g2005 -a /s/a.v"));

        let test = test_job("adder");
        assert_eq!(
            toolchain("nvc").test_command(&test).to_string(),
            "nvc --work=top:/b/top -e --no-save --jit adder -r --load=/rt/libs/libcocotbvpi_nvc.so"
        );
    }

    #[test]
    fn template_expansion() {
        let template = TemplateToolchain::new(
            "questa",
            vec![
                vec!["vlog".into(), "-work".into(), "{build_dir}/work".into(), "{build_args}".into(), "{sources}".into()],
                vec![],
            ],
            vec!["vsim".into(), "{toplevel}".into(), "{plusargs}".into(), "+results={results_file}".into()],
        )
        .unwrap();

        let job = build_job("adder");
        let cmds = template.build_commands(&job);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].to_string(), "vlog -work /b/work -g2005 /s/a.v /s/b.v");

        let mut test = test_job("adder");
        test.plusargs = vec!["+a".into(), "+b".into()];
        let cmd = template.test_command(&test).unwrap();
        assert_eq!(cmd.to_string(), "vsim adder +a +b +results=/b/results.xml");
    }

    #[test]
    fn template_requires_test_command() {
        let err = TemplateToolchain::new("questa", vec![], vec![]).unwrap_err();
        assert!(matches!(err, EngineError::NoToolchain(ref n) if n == "questa"));
    }

    #[test]
    fn results_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xml");
        assert!(check_results(&path, "vvp").is_err());

        fs::write(&path, "<testsuites><testsuite><testcase name=\"a\"/></testsuite></testsuites>").unwrap();
        assert!(check_results(&path, "vvp").is_ok());

        fs::write(&path, "<testsuites><testcase name=\"a\"><failure message=\"x\"/></testcase></testsuites>").unwrap();
        let err = check_results(&path, "vvp").unwrap_err();
        assert!(err.to_string().contains("1 failing test(s)"));
    }

    #[test]
    fn set_resolution_order() {
        let rt = runtime();
        let set = ToolchainSet::new().with_runtime(rt.clone());
        assert!(set.resolve(lookup_profile("icarus").unwrap(), &rt).is_ok());

        let generic = EngineProfile::generic("questa");
        let err = set.resolve(&generic, &rt).err().unwrap();
        assert!(matches!(err, EngineError::NoToolchain(_)));

        let set = set.with_template(
            "questa",
            TemplateToolchain::new("questa", vec![], vec!["vsim".into()]).unwrap(),
        );
        assert!(set.has_configured("questa"));
        assert!(set.resolve(&generic, &rt).is_ok());
        assert_eq!(set.runtime().unwrap(), rt);
    }

    #[cfg(unix)]
    #[test]
    fn template_build_failure_is_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let template = TemplateToolchain::new(
            "fake",
            vec![vec!["sh".into(), "-c".into(), "echo broken >&2; exit 1".into()]],
            vec!["true".into()],
        )
        .unwrap();
        let mut job = build_job("adder");
        job.build_dir = dir.path().to_path_buf();
        job.parameters.clear();
        let err = template.build(&job).unwrap_err();
        match err {
            EngineError::Build { message, .. } => assert!(message.ends_with("broken")),
            other => panic!("expected Build, got {other:?}"),
        }
    }
}

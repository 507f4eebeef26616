//! Blocking subprocess execution with an optional time limit.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::EngineError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A command line to run, with optional working directory and environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run.
    pub program: String,
    /// Its arguments.
    pub args: Vec<String>,
    /// The working directory, if not the current one.
    pub cwd: Option<PathBuf>,
    /// The complete environment. `None` inherits the caller's.
    pub env: Option<BTreeMap<String, String>>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Replaces the environment.
    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        if let Some(env) = &self.env {
            cmd.env_clear().envs(env);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// The captured result of a finished subprocess.
#[derive(Debug)]
pub struct CommandOutput {
    /// The exit status.
    pub status: ExitStatus,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// A short failure description: the tail of stderr (or stdout), or the
    /// exit status if the process printed nothing.
    pub fn failure_message(&self) -> String {
        const TAIL_LINES: usize = 20;
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let lines: Vec<&str> = text.trim_end().lines().collect();
        if lines.is_empty() {
            return self.status.to_string();
        }
        let start = lines.len().saturating_sub(TAIL_LINES);
        format!("{}\n{}", self.status, lines[start..].join("\n"))
    }
}

/// Runs `spec` to completion, killing it if it outlives `timeout`.
///
/// A non-zero exit is not an error here; callers decide what it means.
pub fn run_command(spec: &CommandSpec, timeout: Option<Duration>) -> Result<CommandOutput, EngineError> {
    let command = spec.to_string();
    log::info!("Running: {command}");

    let mut child = spec
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| EngineError::Spawn {
            command: command.clone(),
            source,
        })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match timeout {
        Some(limit) => wait_with_timeout(&mut child, limit, &command)?,
        None => child.wait().map_err(|source| EngineError::Spawn {
            command: command.clone(),
            source,
        })?,
    };

    let output = CommandOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    };
    log::debug!("`{command}` exited with {}", output.status);
    if !output.stdout.is_empty() {
        log::trace!("stdout:\n{}", output.stdout);
    }
    if !output.stderr.is_empty() {
        log::trace!("stderr:\n{}", output.stderr);
    }
    Ok(output)
}

fn wait_with_timeout(child: &mut Child, limit: Duration, command: &str) -> Result<ExitStatus, EngineError> {
    let start = Instant::now();
    loop {
        let polled = child.try_wait().map_err(|source| EngineError::Spawn {
            command: command.to_string(),
            source,
        })?;
        if let Some(status) = polled {
            return Ok(status);
        }
        let elapsed = start.elapsed();
        if elapsed >= limit {
            log::warn!("killing `{command}` after {limit:?}");
            // The process may have exited between the poll and the kill.
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::Timeout {
                command: command.to_string(),
                limit,
            });
        }
        thread::sleep(POLL_INTERVAL.min(limit - elapsed));
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

//! The design-conversion capability and its external-command implementation.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use hdlrun_common::HdlLanguage;
use serde::{Deserialize, Serialize};

use crate::error::LangError;
use crate::platform::BackendPlatform;
use crate::ports::Port;

/// A structural design to be elaborated into HDL text.
///
/// hdlrun never looks inside the design: it is forwarded verbatim to the
/// elaborator, which knows how to load `path` and instantiate `entry` with
/// `args`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Design {
    /// The file defining the design (e.g. a Python module).
    pub path: PathBuf,
    /// The object within `path` to instantiate, if the file defines several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    /// Constructor arguments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, serde_json::Value>,
}

impl Design {
    /// Creates a design reference without an entry point or arguments.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entry: None,
            args: BTreeMap::new(),
        }
    }
}

/// Everything an elaborator needs for one conversion.
#[derive(Debug, Serialize)]
pub struct ConvertRequest<'a> {
    /// The design to convert.
    pub design: &'a Design,
    /// The language to emit.
    pub language: HdlLanguage,
    /// The name of the generated top-level module/entity.
    pub name: &'a str,
    /// The flattened top-level ports.
    pub ports: &'a [Port],
    /// The backend-shaped platform, if any.
    pub platform: Option<&'a BackendPlatform>,
    /// How long the conversion may take. Not sent to the elaborator.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Converts a structural design into HDL text.
///
/// Implementations must be deterministic: converting the same design with the
/// same request twice yields byte-identical text.
pub trait Elaborator: Send + Sync {
    /// Performs the conversion and returns the generated source text.
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<String, LangError>;
}

/// An elaborator that runs an external program.
///
/// The program receives the JSON-encoded [`ConvertRequest`] on stdin and
/// must print the generated HDL on stdout. A non-zero exit status is a
/// conversion failure; its stderr becomes the error message. The program is
/// killed if it outlives the request's timeout.
#[derive(Clone, Debug)]
pub struct CommandElaborator {
    argv: Vec<String>,
}

impl CommandElaborator {
    /// Creates an elaborator from a program and its leading arguments.
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// Returns the configured command line.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    fn display(&self) -> String {
        self.argv.join(" ")
    }

    fn wait_with_timeout(&self, child: &mut Child, limit: Duration) -> Result<ExitStatus, LangError> {
        let start = Instant::now();
        loop {
            let polled = child.try_wait().map_err(|source| LangError::Io {
                command: self.display(),
                source,
            })?;
            if let Some(status) = polled {
                return Ok(status);
            }
            let elapsed = start.elapsed();
            if elapsed >= limit {
                log::warn!("killing `{}` after {limit:?}", self.display());
                let _ = child.kill();
                let _ = child.wait();
                return Err(LangError::Timeout {
                    command: self.display(),
                    limit,
                });
            }
            thread::sleep(POLL_INTERVAL.min(limit - elapsed));
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

impl Elaborator for CommandElaborator {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<String, LangError> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| LangError::Encode("empty elaborator command".to_string()))?;
        let payload =
            serde_json::to_vec(request).map_err(|e| LangError::Encode(e.to_string()))?;

        let io_err = |source| LangError::Io {
            command: self.display(),
            source,
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg("--language")
            .arg(request.language.tag())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        log::info!("Running: {:?}", cmd);
        let mut child = cmd.spawn().map_err(io_err)?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).map_err(io_err)?;
        }

        let status = match request.timeout {
            Some(limit) => self.wait_with_timeout(&mut child, limit)?,
            None => child.wait().map_err(io_err)?,
        };
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            return Err(LangError::Elaboration {
                command: self.display(),
                message: if stderr.is_empty() {
                    format!("exited with {status}")
                } else {
                    stderr
                },
            });
        }

        String::from_utf8(stdout).map_err(|e| LangError::Elaboration {
            command: self.display(),
            message: format!("output is not valid UTF-8: {e}"),
        })
    }
}

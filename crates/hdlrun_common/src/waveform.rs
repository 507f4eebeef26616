//! Waveform trace formats accepted as run destinations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Waveform trace format, inferred from the destination file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformFormat {
    /// Value Change Dump (IEEE 1364).
    Vcd,
    /// Fast Signal Trace (GTKWave native format).
    Fst,
}

impl WaveformFormat {
    /// Returns the file extension (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            WaveformFormat::Vcd => "vcd",
            WaveformFormat::Fst => "fst",
        }
    }

    /// Infers the format from a destination path's extension.
    pub fn from_path(path: &Path) -> Result<Self, ParseWaveformError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl fmt::Display for WaveformFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Error returned for waveform extensions other than `vcd` and `fst`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid extension for waveform: '{input}'. Supported extensions are: vcd fst")]
pub struct ParseWaveformError {
    /// The extension that failed to parse.
    pub input: String,
}

impl FromStr for WaveformFormat {
    type Err = ParseWaveformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vcd" => Ok(WaveformFormat::Vcd),
            "fst" => Ok(WaveformFormat::Fst),
            _ => Err(ParseWaveformError {
                input: s.to_string(),
            }),
        }
    }
}

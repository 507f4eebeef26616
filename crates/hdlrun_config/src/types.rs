//! Configuration data types deserialized from `hdlrun.toml`.

use hdlrun_common::{HdlLanguage, Timescale};
use hdlrun_engine::{ParamValue, RuntimeOverrides};
use hdlrun_lang::{Design, Platform, PortTree};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration parsed from an `hdlrun.toml` file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HdlrunConfig {
    /// Settings shared by every run.
    #[serde(default)]
    pub run: RunProfile,
    /// Named run profiles, each overlaying `[run]`.
    #[serde(default)]
    pub runs: BTreeMap<String, RunProfile>,
    /// Elaborator command overrides keyed by backend tag.
    #[serde(default)]
    pub backends: BTreeMap<String, BackendConfig>,
    /// Template toolchains keyed by engine name.
    #[serde(default)]
    pub engines: BTreeMap<String, EngineConfig>,
    /// Test-runtime path overrides.
    #[serde(default)]
    pub runtime: RuntimeOverrides,
}

/// The settings of one simulation run.
///
/// Every field is optional so that a named profile only has to state what
/// differs from `[run]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunProfile {
    /// The simulation engine.
    pub engine: Option<String>,
    /// The HDL language the design is converted into.
    pub language: Option<String>,
    /// The elaboration backend tag.
    pub backend: Option<String>,
    /// The toplevel module/entity name.
    pub toplevel: Option<String>,
    /// The test module name or absolute test file path.
    pub test_module: Option<String>,
    /// Pre-written HDL sources.
    #[serde(default)]
    pub sources: SourceConfig,
    /// A structural design to convert.
    pub design: Option<Design>,
    /// The design's top-level ports.
    pub ports: Option<PortTree>,
    /// The elaboration platform.
    pub platform: Option<Platform>,
    /// Top-level parameters or generics.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    /// The random seed.
    pub seed: Option<u64>,
    /// Extra environment variables for the test process.
    #[serde(default)]
    pub extra_env: BTreeMap<String, String>,
    /// Extra build arguments.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub extra_args: Vec<String>,
    /// The `(unit, precision)` timescale pair, e.g. `["1ns", "1ps"]`.
    pub timescale: Option<Timescale>,
    /// A persistent working directory.
    pub working_directory: Option<PathBuf>,
    /// Where to put the waveform trace (`.vcd` or `.fst`).
    pub waveform_file: Option<PathBuf>,
    /// Older spelling of `waveform_file`.
    pub vcd_file: Option<PathBuf>,
    /// Per-subprocess time limit in seconds.
    pub timeout_secs: Option<u64>,
}

/// HDL source files grouped by language.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Verilog sources.
    #[serde(default)]
    pub verilog: Vec<PathBuf>,
    /// VHDL sources.
    #[serde(default)]
    pub vhdl: Vec<PathBuf>,
}

impl SourceConfig {
    /// Returns the non-empty source lists keyed by language.
    pub fn by_language(&self) -> BTreeMap<HdlLanguage, Vec<PathBuf>> {
        [
            (HdlLanguage::Verilog, &self.verilog),
            (HdlLanguage::Vhdl, &self.vhdl),
        ]
        .into_iter()
        .filter(|(_, files)| !files.is_empty())
        .map(|(lang, files)| (lang, files.clone()))
        .collect()
    }

    /// Returns `true` if no language has sources.
    pub fn is_empty(&self) -> bool {
        self.verilog.is_empty() && self.vhdl.is_empty()
    }
}

/// An elaborator override for one backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// The elaborator argv.
    ///
    /// Accepts either a single program name or a list of arguments.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub command: Vec<String>,
}

/// A command-template toolchain for an engine without built-in support.
///
/// Arguments may contain `{toplevel}`, `{build_dir}`, `{waveform}` and
/// `{results_file}`; an argument that is exactly `{sources}`, `{build_args}`,
/// `{test_args}` or `{plusargs}` expands to the whole list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Build commands, run in order.
    #[serde(default)]
    pub build: Vec<Vec<String>>,
    /// The test command.
    #[serde(default)]
    pub test: Vec<String>,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `extra_args = "-Wall"` (string) and
/// `extra_args = ["-Wall", "-g2012"]` (array of strings).
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

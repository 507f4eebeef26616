//! The caller's description of one simulation run.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use hdlrun_common::{HdlLanguage, Timescale};
use hdlrun_engine::ParamValue;
use hdlrun_lang::{Design, Platform, PortTree};

/// The engine used when a request does not name one.
pub const DEFAULT_ENGINE: &str = "icarus";

/// The toplevel name given to a converted design when none is requested.
pub const DEFAULT_TOPLEVEL: &str = "top";

/// Everything needed to run one test.
///
/// A request is immutable once handed to the coordinator.
#[derive(Clone, Debug)]
pub struct SimulationRequest {
    /// A structural design to convert into HDL.
    pub design: Option<Design>,
    /// The toplevel module/entity name.
    pub toplevel: Option<String>,
    /// The design's top-level ports.
    pub ports: PortTree,
    /// Pre-written HDL sources by language.
    pub sources: BTreeMap<HdlLanguage, Vec<PathBuf>>,
    /// The simulation engine.
    pub engine: String,
    /// The language to convert the design into.
    pub language: Option<String>,
    /// The elaboration backend tag.
    pub backend: Option<String>,
    /// Top-level parameters or generics.
    pub parameters: BTreeMap<String, ParamValue>,
    /// The random seed; drawn at random when absent.
    pub seed: Option<u64>,
    /// Extra environment variables for the test process.
    pub extra_env: BTreeMap<String, String>,
    /// Extra build arguments.
    pub extra_args: Vec<String>,
    /// Where to put the waveform trace.
    pub waveform_file: Option<PathBuf>,
    /// Older name for `waveform_file`.
    pub vcd_file: Option<PathBuf>,
    /// The timescale.
    pub timescale: Timescale,
    /// A persistent working directory; a temporary one is used otherwise.
    pub working_directory: Option<PathBuf>,
    /// The test module name or absolute test file path.
    pub test_module: String,
    /// The elaboration platform.
    pub platform: Option<Platform>,
    /// Per-subprocess time limit.
    pub timeout: Option<Duration>,
}

impl SimulationRequest {
    /// Creates a request for `test_module` with every other field defaulted.
    pub fn new(test_module: impl Into<String>) -> Self {
        Self {
            design: None,
            toplevel: None,
            ports: PortTree::empty(),
            sources: BTreeMap::new(),
            engine: DEFAULT_ENGINE.to_string(),
            language: None,
            backend: None,
            parameters: BTreeMap::new(),
            seed: None,
            extra_env: BTreeMap::new(),
            extra_args: Vec::new(),
            waveform_file: None,
            vcd_file: None,
            timescale: Timescale::default(),
            working_directory: None,
            test_module: test_module.into(),
            platform: None,
            timeout: None,
        }
    }

    /// Adds sources for `lang`.
    pub fn with_sources<I, P>(mut self, lang: HdlLanguage, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources
            .entry(lang)
            .or_default()
            .extend(files.into_iter().map(Into::into));
        self
    }

    /// The languages with at least one source file.
    pub fn source_languages(&self) -> impl Iterator<Item = HdlLanguage> + '_ {
        self.sources
            .iter()
            .filter(|(_, files)| !files.is_empty())
            .map(|(lang, _)| *lang)
    }
}

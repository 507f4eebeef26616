//! Elaboration backends and their language registries.
//!
//! Two backends are known. `amaranth` emits Verilog only; asking it for VHDL
//! fails at conversion time rather than at lookup time, so that the registry
//! still recognizes `.vhd` files staged alongside the design. `celosia`
//! emits both languages.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use hdlrun_common::HdlLanguage;

use crate::elaborator::{CommandElaborator, Elaborator};
use crate::error::LangError;
use crate::platform::{BackendPlatform, Platform};
use crate::registry::{Converter, LanguageDescriptor, LanguageRegistry};

/// A design-elaboration backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    /// The Amaranth HDL toolchain.
    #[default]
    Amaranth,
    /// The Celosia toolchain.
    Celosia,
}

impl Backend {
    /// Every known backend.
    pub const ALL: [Backend; 2] = [Backend::Amaranth, Backend::Celosia];

    /// The configuration tag of this backend.
    pub fn tag(self) -> &'static str {
        match self {
            Backend::Amaranth => "amaranth",
            Backend::Celosia => "celosia",
        }
    }

    /// The languages this backend can emit.
    pub fn emits(self, lang: HdlLanguage) -> bool {
        match self {
            Backend::Amaranth => lang == HdlLanguage::Verilog,
            Backend::Celosia => true,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Backend {
    type Err = LangError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amaranth" => Ok(Backend::Amaranth),
            "celosia" => Ok(Backend::Celosia),
            other => Err(LangError::UnknownBackend(other.to_string())),
        }
    }
}

/// Resolves backend tags into language registries and normalizes platforms.
///
/// Each backend converts through an [`Elaborator`]. By default that is a
/// [`CommandElaborator`] running `python3 -m hdlrun_elaborate --backend <tag>`;
/// the command or the whole elaborator can be replaced per backend.
#[derive(Clone, Default)]
pub struct BackendAdapter {
    overrides: HashMap<Backend, Arc<dyn Elaborator>>,
}

impl fmt::Debug for BackendAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.overrides.keys().map(|b| b.tag()).collect();
        keys.sort_unstable();
        f.debug_struct("BackendAdapter")
            .field("overrides", &keys)
            .finish()
    }
}

/// The default elaborator command line for `backend`.
pub fn default_command(backend: Backend) -> Vec<String> {
    vec![
        "python3".to_string(),
        "-m".to_string(),
        "hdlrun_elaborate".to_string(),
        "--backend".to_string(),
        backend.tag().to_string(),
    ]
}

impl BackendAdapter {
    /// Creates an adapter using the default elaborator commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the elaborator command for `backend`.
    pub fn with_command(self, backend: Backend, argv: Vec<String>) -> Self {
        self.with_elaborator(backend, Arc::new(CommandElaborator::new(argv)))
    }

    /// Replaces the elaborator for `backend`.
    pub fn with_elaborator(mut self, backend: Backend, elaborator: Arc<dyn Elaborator>) -> Self {
        self.overrides.insert(backend, elaborator);
        self
    }

    fn elaborator(&self, backend: Backend) -> Arc<dyn Elaborator> {
        match self.overrides.get(&backend) {
            Some(elaborator) => Arc::clone(elaborator),
            None => Arc::new(CommandElaborator::new(default_command(backend))),
        }
    }

    /// Parses a backend tag, defaulting to `amaranth`.
    pub fn backend(tag: Option<&str>) -> Result<Backend, LangError> {
        tag.map_or(Ok(Backend::default()), |t| t.parse())
    }

    /// Returns the language registry of the backend named by `tag`.
    pub fn resolve(&self, tag: Option<&str>) -> Result<LanguageRegistry, LangError> {
        let backend = Self::backend(tag)?;
        let elaborator = self.elaborator(backend);
        let descriptors = HdlLanguage::ALL
            .iter()
            .map(|&lang| {
                let converter = if backend.emits(lang) {
                    Converter::Supported(Arc::clone(&elaborator))
                } else {
                    Converter::Unsupported {
                        reason: format!("{backend} to {} not supported", display_name(lang)),
                    }
                };
                LanguageDescriptor::new(lang, converter)
            })
            .collect();
        Ok(LanguageRegistry::new(backend.tag(), descriptors))
    }

    /// Normalizes `platform` into the shape the backend named by `tag` expects.
    pub fn convert_platform(
        &self,
        platform: Option<&Platform>,
        tag: Option<&str>,
    ) -> Result<Option<BackendPlatform>, LangError> {
        let backend = Self::backend(tag)?;
        let Some(platform) = platform else {
            return Ok(None);
        };
        let converted = match (backend, platform) {
            (Backend::Amaranth, Platform::Amaranth(spec)) => BackendPlatform::Amaranth(spec.clone()),
            (Backend::Amaranth, Platform::Celosia(spec)) => {
                return Err(LangError::UnsupportedCapability(format!(
                    "amaranth backend cannot use celosia platform '{}'",
                    spec.name
                )))
            }
            (Backend::Celosia, Platform::Amaranth(spec)) => {
                log::debug!("converting amaranth platform '{}' for celosia", spec.name);
                BackendPlatform::celosia_from_amaranth(spec)
            }
            (Backend::Celosia, Platform::Celosia(spec)) => BackendPlatform::Celosia {
                spec: spec.clone(),
                converted_from: None,
            },
        };
        Ok(Some(converted))
    }
}

fn display_name(lang: HdlLanguage) -> &'static str {
    match lang {
        HdlLanguage::Verilog => "Verilog",
        HdlLanguage::Vhdl => "VHDL",
    }
}

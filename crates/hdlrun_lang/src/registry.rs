//! The per-backend registry of HDL languages.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hdlrun_common::HdlLanguage;

use crate::elaborator::{ConvertRequest, Design, Elaborator};
use crate::error::LangError;
use crate::platform::BackendPlatform;
use crate::ports::Port;

/// How a language descriptor turns a design into source text.
#[derive(Clone)]
pub enum Converter {
    /// Conversion is delegated to an elaborator.
    Supported(Arc<dyn Elaborator>),
    /// The backend cannot emit this language.
    Unsupported {
        /// The message reported when conversion is attempted.
        reason: String,
    },
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Converter::Supported(_) => f.write_str("Supported(..)"),
            Converter::Unsupported { reason } => f
                .debug_struct("Unsupported")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Everything hdlrun knows about one HDL language under one backend.
#[derive(Clone, Debug)]
pub struct LanguageDescriptor {
    /// The language.
    pub id: HdlLanguage,
    /// File extensions (without the dot) recognized as this language.
    pub extensions: &'static [&'static str],
    /// The extension used for generated files.
    pub default_extension: &'static str,
    /// The conversion capability.
    pub converter: Converter,
}

impl LanguageDescriptor {
    /// Creates a descriptor with the standard extensions for `id`.
    pub fn new(id: HdlLanguage, converter: Converter) -> Self {
        const VERILOG: &[&str] = &["v"];
        const VHDL: &[&str] = &["vhd", "vhdl"];
        let (extensions, default_extension) = match id {
            HdlLanguage::Verilog => (VERILOG, "v"),
            HdlLanguage::Vhdl => (VHDL, "vhd"),
        };
        Self {
            id,
            extensions,
            default_extension,
            converter,
        }
    }

    /// Returns true if files with extension `ext` belong to this language.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Returns true if this backend can convert designs into this language.
    pub fn can_convert(&self) -> bool {
        matches!(self.converter, Converter::Supported(_))
    }

    /// Fails with the backend's reason if conversion into this language is
    /// impossible, without running anything.
    pub fn check_convert(&self) -> Result<(), LangError> {
        match &self.converter {
            Converter::Supported(_) => Ok(()),
            Converter::Unsupported { reason } => {
                Err(LangError::UnsupportedCapability(reason.clone()))
            }
        }
    }

    /// Converts `design` into source text of this language, giving the
    /// elaborator at most `timeout`.
    pub fn convert(
        &self,
        design: &Design,
        name: &str,
        ports: &[Port],
        platform: Option<&BackendPlatform>,
        timeout: Option<Duration>,
    ) -> Result<String, LangError> {
        match &self.converter {
            Converter::Supported(elaborator) => {
                log::debug!("converting {} to {} as `{name}`", design.path.display(), self.id);
                elaborator.convert(&ConvertRequest {
                    design,
                    language: self.id,
                    name,
                    ports,
                    platform,
                    timeout,
                })
            }
            Converter::Unsupported { reason } => {
                Err(LangError::UnsupportedCapability(reason.clone()))
            }
        }
    }
}

/// The languages available under one elaboration backend, in declaration order.
#[derive(Clone, Debug)]
pub struct LanguageRegistry {
    backend: String,
    descriptors: Vec<LanguageDescriptor>,
}

impl LanguageRegistry {
    /// Creates a registry for `backend` from descriptors in preference order.
    pub fn new(backend: impl Into<String>, descriptors: Vec<LanguageDescriptor>) -> Self {
        Self {
            backend: backend.into(),
            descriptors,
        }
    }

    /// The backend this registry belongs to.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Looks up a language by tag.
    pub fn get(&self, tag: &str) -> Result<&LanguageDescriptor, LangError> {
        let lang: HdlLanguage = tag
            .parse()
            .map_err(|_| LangError::UnsupportedLanguage(tag.to_string()))?;
        self.get_language(lang)
            .ok_or_else(|| LangError::UnsupportedLanguage(tag.to_string()))
    }

    /// Looks up a language by id.
    pub fn get_language(&self, lang: HdlLanguage) -> Option<&LanguageDescriptor> {
        self.descriptors.iter().find(|d| d.id == lang)
    }

    /// Iterates over the descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &LanguageDescriptor> {
        self.descriptors.iter()
    }

    /// Returns the registered languages in declaration order.
    pub fn languages(&self) -> Vec<HdlLanguage> {
        self.descriptors.iter().map(|d| d.id).collect()
    }

    /// Returns the first language among `allowed` whose descriptor accepts `ext`.
    pub fn language_for_extension(&self, ext: &str, allowed: &[HdlLanguage]) -> Option<HdlLanguage> {
        self.descriptors
            .iter()
            .filter(|d| allowed.contains(&d.id))
            .find(|d| d.accepts_extension(ext))
            .map(|d| d.id)
    }
}

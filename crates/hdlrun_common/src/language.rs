//! Hardware description language identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A hardware description language understood by hdlrun.
///
/// The declaration order is the registry order used when negotiating which
/// language a design should be converted to: Verilog is preferred over VHDL
/// whenever an engine accepts both.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HdlLanguage {
    /// Verilog (`.v`).
    Verilog,
    /// VHDL (`.vhd`, `.vhdl`).
    Vhdl,
}

impl HdlLanguage {
    /// Every language in registry order.
    pub const ALL: [HdlLanguage; 2] = [HdlLanguage::Verilog, HdlLanguage::Vhdl];

    /// Returns the lowercase tag used in configuration files and on the command line.
    pub fn tag(self) -> &'static str {
        match self {
            HdlLanguage::Verilog => "verilog",
            HdlLanguage::Vhdl => "vhdl",
        }
    }
}

impl fmt::Display for HdlLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when a language tag is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{input}'")]
pub struct ParseLanguageError {
    /// The tag that failed to parse.
    pub input: String,
}

impl FromStr for HdlLanguage {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verilog" => Ok(HdlLanguage::Verilog),
            "vhdl" => Ok(HdlLanguage::Vhdl),
            _ => Err(ParseLanguageError {
                input: s.to_string(),
            }),
        }
    }
}

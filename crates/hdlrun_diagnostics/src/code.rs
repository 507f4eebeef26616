//! Diagnostic codes with category prefixes for structured identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Error diagnostics, prefixed with `E`.
    Error,
    /// Warning diagnostics, prefixed with `W`.
    Warning,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a numeric identifier.
///
/// Displayed as the category prefix followed by a zero-padded 3-digit number,
/// e.g. `W301`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// The requested waveform could not be found after the run.
    pub const WAVEFORM_MISSING: DiagnosticCode = DiagnosticCode::new(Category::Warning, 301);
    /// The engine cannot produce the requested waveform format and disabled tracing.
    pub const WAVEFORM_DEGRADED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 302);
    /// The engine name is not in the known-engine table.
    pub const UNKNOWN_SIMULATOR: DiagnosticCode = DiagnosticCode::new(Category::Warning, 303);
    /// The engine's build step failed.
    pub const BUILD_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 401);
    /// The engine's test step failed.
    pub const TEST_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 402);
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

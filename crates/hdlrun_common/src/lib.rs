//! Shared foundational types used across the hdlrun workspace.
//!
//! This crate provides the HDL language identifiers, waveform formats,
//! simulation timescales, content hashing for staged files, and the
//! internal error type shared by every other crate.

#![warn(missing_docs)]

pub mod hash;
pub mod language;
pub mod result;
pub mod timescale;
pub mod waveform;

pub use hash::ContentHash;
pub use language::{HdlLanguage, ParseLanguageError};
pub use result::{InternalError, RunnerResult};
pub use timescale::{ParseTimescaleError, TimeSpec, Timescale};
pub use waveform::{ParseWaveformError, WaveformFormat};

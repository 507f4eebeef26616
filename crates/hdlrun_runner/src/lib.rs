//! Run coordination for hdlrun.
//!
//! A [`SimulationRequest`] describes one test run. [`RunCoordinator::run`]
//! validates it, negotiates an engine and a language, stages every input in a
//! [`StagingDirectory`], converts the design if one was given and hands the
//! result to the engine adapter. Configuration problems are returned as
//! [`RunError`]s before anything is staged; build and test failures come back
//! as an unsuccessful [`RunResult`].

#![warn(missing_docs)]

pub mod coordinator;
pub mod entry;
pub mod error;
pub mod request;
pub mod staging;

pub use coordinator::{RunCoordinator, RunResult};
pub use entry::{resolve_test_entry, TestEntry};
pub use error::RunError;
pub use request::SimulationRequest;
pub use staging::{StagedFile, StagingDirectory, StagingError};

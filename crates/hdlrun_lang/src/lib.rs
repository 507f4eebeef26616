//! HDL language negotiation and design-conversion backends.
//!
//! A design supplied as a structural object has to be turned into concrete
//! HDL text before any engine can build it. This crate describes which
//! languages exist ([`LanguageRegistry`]), which elaboration backend converts
//! to which of them ([`BackendAdapter`]), how platforms are normalized for
//! each backend, and how nested port descriptions are flattened.
//!
//! The elaboration itself is an external collaborator reached through the
//! [`Elaborator`] trait. [`CommandElaborator`] drives an external program;
//! tests substitute their own implementation.

#![warn(missing_docs)]

pub mod backend;
pub mod elaborator;
pub mod error;
pub mod platform;
pub mod ports;
pub mod registry;

pub use backend::{Backend, BackendAdapter};
pub use elaborator::{CommandElaborator, ConvertRequest, Design, Elaborator};
pub use error::LangError;
pub use platform::{BackendPlatform, ExtraFile, Platform, PlatformSpec};
pub use ports::{flatten_ports, Port, PortDirection, PortTree};
pub use registry::{Converter, LanguageDescriptor, LanguageRegistry};

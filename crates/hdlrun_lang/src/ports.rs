//! Port descriptions and their flattening into atomic ports.
//!
//! Callers describe a design's top-level ports as arbitrarily nested
//! containers: lists of signals, named groups, or a wrapper around another
//! description. The elaborator only wants a flat, ordered list, which
//! [`flatten_ports`] produces. Anything that is not one of the known
//! container shapes is rejected instead of being silently skipped.

use crate::error::LangError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Direction of a top-level port, when the caller states it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Driven from outside the design.
    Input,
    /// Driven by the design.
    Output,
    /// Driven from both sides.
    Inout,
}

/// A single atomic port of the design.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Port {
    /// The signal name.
    pub name: String,
    /// The width in bits.
    #[serde(default = "default_width")]
    pub width: u32,
    /// The direction, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<PortDirection>,
}

fn default_width() -> u32 {
    1
}

impl Port {
    /// Creates a port with the given name and width and no stated direction.
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            direction: None,
        }
    }
}

/// A possibly nested description of ports.
///
/// Deserialized without tags: an object with a `name` is a signal, an object
/// with only `value` is a wrapper, arrays are sequences and other objects are
/// named groups (visited in key order). Bare numbers, strings and booleans
/// deserialize successfully so that flattening can report them by value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortTree {
    /// A single signal.
    Signal(Port),
    /// A wrapper around another description (a record or view exposing a value).
    Wrapped {
        /// The wrapped description.
        value: Box<PortTree>,
    },
    /// An ordered sequence of descriptions.
    Seq(Vec<PortTree>),
    /// Named descriptions; only the values are ports.
    Map(BTreeMap<String, PortTree>),
    /// A boolean, never a valid port.
    Bool(bool),
    /// An integer, never a valid port.
    Int(i64),
    /// A float, never a valid port.
    Float(f64),
    /// A string, never a valid port.
    Text(String),
}

impl PortTree {
    /// Returns an empty port description.
    pub fn empty() -> Self {
        PortTree::Seq(Vec::new())
    }

    fn visit(&self, out: &mut Vec<Port>) -> Result<(), LangError> {
        match self {
            PortTree::Signal(port) => out.push(port.clone()),
            PortTree::Wrapped { value } => value.visit(out)?,
            PortTree::Seq(items) => {
                for item in items {
                    item.visit(out)?;
                }
            }
            PortTree::Map(entries) => {
                for item in entries.values() {
                    item.visit(out)?;
                }
            }
            PortTree::Bool(v) => return Err(LangError::InvalidPort(v.to_string())),
            PortTree::Int(v) => return Err(LangError::InvalidPort(v.to_string())),
            PortTree::Float(v) => return Err(LangError::InvalidPort(v.to_string())),
            PortTree::Text(v) => return Err(LangError::InvalidPort(format!("{v:?}"))),
        }
        Ok(())
    }
}

impl Default for PortTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Port>> for PortTree {
    fn from(ports: Vec<Port>) -> Self {
        PortTree::Seq(ports.into_iter().map(PortTree::Signal).collect())
    }
}

/// Flattens a port description into an ordered list of atomic ports.
pub fn flatten_ports(tree: &PortTree) -> Result<Vec<Port>, LangError> {
    let mut out = Vec::new();
    tree.visit(&mut out)?;
    Ok(out)
}

//! Design parameter values and their rendering on engine command lines.

use hdlrun_common::HdlLanguage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value of a top-level parameter (Verilog) or generic (VHDL).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A string.
    Text(String),
}

impl ParamValue {
    /// Renders the value the way an engine for `lang` expects it after `name=`.
    ///
    /// Verilog engines take strings as quoted literals and booleans as `1`/`0`;
    /// VHDL engines take them bare.
    pub fn render(&self, lang: HdlLanguage) -> String {
        match (self, lang) {
            (ParamValue::Bool(b), HdlLanguage::Verilog) => u8::from(*b).to_string(),
            (ParamValue::Bool(b), HdlLanguage::Vhdl) => b.to_string(),
            (ParamValue::Int(i), _) => i.to_string(),
            (ParamValue::Text(s), HdlLanguage::Verilog) => sv_literal(s),
            (ParamValue::Text(s), HdlLanguage::Vhdl) => s.clone(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// Quotes `s` as a SystemVerilog string literal.
pub fn sv_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

//! HDL timescale values (`time_unit / time_precision`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = 1_000_000_000_000_000;

/// One side of a timescale, e.g. `10ns`.
///
/// Verilog only allows the magnitudes 1, 10 and 100, so the same restriction
/// is applied here; engines reject anything else at build time with far less
/// helpful messages.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeSpec {
    magnitude: u16,
    unit: &'static str,
    unit_fs: u64,
}

impl TimeSpec {
    /// Returns the duration in femtoseconds.
    pub fn as_fs(&self) -> u64 {
        u64::from(self.magnitude) * self.unit_fs
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit)
    }
}

/// Error type for parsing time specifications and timescales.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTimescaleError {
    /// The time specification is not `<1|10|100><fs|ps|ns|us|ms|s>`.
    #[error("invalid time specification: '{input}'")]
    InvalidSpec {
        /// The input that failed to parse.
        input: String,
    },
    /// The precision is coarser than the unit.
    #[error("timescale precision {precision} is coarser than unit {unit}")]
    PrecisionCoarserThanUnit {
        /// The time unit.
        unit: String,
        /// The time precision.
        precision: String,
    },
}

impl FromStr for TimeSpec {
    type Err = ParseTimescaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseTimescaleError::InvalidSpec {
            input: s.to_string(),
        };

        let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        if digit_end == 0 {
            return Err(err());
        }
        let magnitude: u16 = s[..digit_end].parse().map_err(|_| err())?;
        if !matches!(magnitude, 1 | 10 | 100) {
            return Err(err());
        }

        let (unit, unit_fs) = match s[digit_end..].trim() {
            "fs" => ("fs", 1),
            "ps" => ("ps", FS_PER_PS),
            "ns" => ("ns", FS_PER_NS),
            "us" => ("us", FS_PER_US),
            "ms" => ("ms", FS_PER_MS),
            "s" => ("s", FS_PER_S),
            _ => return Err(err()),
        };

        Ok(TimeSpec {
            magnitude,
            unit,
            unit_fs,
        })
    }
}

/// A `(time_unit, time_precision)` pair passed to every engine.
///
/// Serializes as a two-element list of strings, e.g. `["1ns", "1ps"]`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(try_from = "(String, String)", into = "(String, String)")]
pub struct Timescale {
    /// The time unit.
    pub unit: TimeSpec,
    /// The time precision.
    pub precision: TimeSpec,
}

impl Timescale {
    /// Parses and validates a unit/precision pair.
    pub fn new(unit: &str, precision: &str) -> Result<Self, ParseTimescaleError> {
        let unit: TimeSpec = unit.parse()?;
        let precision: TimeSpec = precision.parse()?;
        if precision.as_fs() > unit.as_fs() {
            return Err(ParseTimescaleError::PrecisionCoarserThanUnit {
                unit: unit.to_string(),
                precision: precision.to_string(),
            });
        }
        Ok(Self { unit, precision })
    }
}

impl Default for Timescale {
    fn default() -> Self {
        Self {
            unit: TimeSpec {
                magnitude: 1,
                unit: "ns",
                unit_fs: FS_PER_NS,
            },
            precision: TimeSpec {
                magnitude: 1,
                unit: "ps",
                unit_fs: FS_PER_PS,
            },
        }
    }
}

impl fmt::Display for Timescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.unit, self.precision)
    }
}

impl FromStr for Timescale {
    type Err = ParseTimescaleError;

    /// Parses the `unit/precision` form used on the command line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (unit, precision) = s
            .split_once('/')
            .ok_or_else(|| ParseTimescaleError::InvalidSpec {
                input: s.to_string(),
            })?;
        Timescale::new(unit, precision)
    }
}

impl TryFrom<(String, String)> for Timescale {
    type Error = ParseTimescaleError;

    fn try_from((unit, precision): (String, String)) -> Result<Self, Self::Error> {
        Timescale::new(&unit, &precision)
    }
}

impl From<Timescale> for (String, String) {
    fn from(ts: Timescale) -> Self {
        (ts.unit.to_string(), ts.precision.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_1ns_1ps() {
        let ts = Timescale::default();
        assert_eq!(ts.to_string(), "1ns/1ps");
        assert_eq!(ts, Timescale::new("1ns", "1ps").unwrap());
    }

    #[test]
    fn parse_all_units() {
        for (input, fs) in [
            ("1fs", 1),
            ("10ps", 10 * FS_PER_PS),
            ("100ns", 100 * FS_PER_NS),
            ("1us", FS_PER_US),
            ("10ms", 10 * FS_PER_MS),
            ("1s", FS_PER_S),
        ] {
            let spec: TimeSpec = input.parse().unwrap();
            assert_eq!(spec.as_fs(), fs, "{input}");
            assert_eq!(spec.to_string(), input);
        }
    }

    #[test]
    fn bad_magnitude_rejected() {
        assert!("5ns".parse::<TimeSpec>().is_err());
        assert!("1000ps".parse::<TimeSpec>().is_err());
    }

    #[test]
    fn missing_number_or_unit_rejected() {
        assert!("ns".parse::<TimeSpec>().is_err());
        assert!("10".parse::<TimeSpec>().is_err());
        assert!("10hz".parse::<TimeSpec>().is_err());
    }

    #[test]
    fn precision_coarser_than_unit_rejected() {
        let err = Timescale::new("1ps", "1ns").unwrap_err();
        assert!(matches!(
            err,
            ParseTimescaleError::PrecisionCoarserThanUnit { .. }
        ));
    }

    #[test]
    fn parse_slash_form() {
        let ts: Timescale = "10ns/100ps".parse().unwrap();
        assert_eq!(ts.to_string(), "10ns/100ps");
        assert!("10ns".parse::<Timescale>().is_err());
    }

    #[test]
    fn serde_as_pair() {
        let ts = Timescale::new("1us", "1ns").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, r#"["1us","1ns"]"#);
        let back: Timescale = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
        assert!(serde_json::from_str::<Timescale>(r#"["1ps","1ns"]"#).is_err());
    }
}

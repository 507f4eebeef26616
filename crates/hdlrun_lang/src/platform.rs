//! Elaboration platforms and their per-backend normalization.
//!
//! A platform describes the hardware a design targets and may carry extra
//! files (memory images, vendor primitives) that have to be staged next to
//! the generated HDL. The two supported elaboration backends describe
//! platforms in different shapes, so a caller-supplied [`Platform`] is
//! normalized into a [`BackendPlatform`] before conversion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The content of an extra platform file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraFile {
    /// UTF-8 text, written as-is.
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl ExtraFile {
    /// Returns the bytes to write into the staging directory.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ExtraFile::Text(text) => text.as_bytes(),
            ExtraFile::Binary(bytes) => bytes,
        }
    }
}

/// The shape-independent content of a platform description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformSpec {
    /// The platform name (board or device family).
    pub name: String,
    /// Files to stage alongside the generated HDL, keyed by file name.
    #[serde(default)]
    pub extra_files: BTreeMap<String, ExtraFile>,
    /// Backend-specific properties passed through to the elaborator.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// A caller-supplied platform, tagged with the backend family that describes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Platform {
    /// An Amaranth-style platform.
    Amaranth(PlatformSpec),
    /// A Celosia-style platform.
    Celosia(PlatformSpec),
}

impl Platform {
    /// Returns the platform content regardless of its shape.
    pub fn spec(&self) -> &PlatformSpec {
        match self {
            Platform::Amaranth(spec) | Platform::Celosia(spec) => spec,
        }
    }

    /// Returns the extra files that must be staged for this platform.
    pub fn extra_files(&self) -> &BTreeMap<String, ExtraFile> {
        &self.spec().extra_files
    }
}

/// A platform in the shape the selected backend's elaborator expects.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendPlatform {
    /// Passed to the Amaranth elaborator unchanged.
    Amaranth(PlatformSpec),
    /// Passed to the Celosia elaborator.
    Celosia {
        /// The platform content.
        #[serde(flatten)]
        spec: PlatformSpec,
        /// The shape the platform was converted from, if it was converted.
        #[serde(skip_serializing_if = "Option::is_none")]
        converted_from: Option<String>,
    },
}

impl BackendPlatform {
    /// Builds a Celosia platform from an Amaranth one.
    pub fn celosia_from_amaranth(spec: &PlatformSpec) -> Self {
        BackendPlatform::Celosia {
            spec: spec.clone(),
            converted_from: Some("amaranth".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_tagged_platform() {
        let json = r#"{
            "kind": "amaranth",
            "name": "icebreaker",
            "extra_files": {"init.hex": "00\n01\n", "blob.bin": [1, 2, 3]}
        }"#;
        let platform: Platform = serde_json::from_str(json).unwrap();
        assert!(matches!(platform, Platform::Amaranth(_)));
        assert_eq!(platform.spec().name, "icebreaker");
        assert_eq!(platform.extra_files()["init.hex"].as_bytes(), b"00\n01\n");
        assert_eq!(platform.extra_files()["blob.bin"].as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn unknown_kind_rejected() {
        let json = r#"{"kind": "litex", "name": "arty"}"#;
        assert!(serde_json::from_str::<Platform>(json).is_err());
    }

    #[test]
    fn celosia_conversion_records_origin() {
        let spec = PlatformSpec {
            name: "ulx3s".into(),
            ..Default::default()
        };
        let converted = BackendPlatform::celosia_from_amaranth(&spec);
        let json = serde_json::to_value(&converted).unwrap();
        assert_eq!(json["kind"], "celosia");
        assert_eq!(json["name"], "ulx3s");
        assert_eq!(json["converted_from"], "amaranth");
    }
}

//! Content hashing for staged files and generated HDL.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A 128-bit content hash computed using XXH3.
///
/// Every file written into a staging directory records its hash, which makes
/// it cheap to check that two conversions of the same design produced
/// byte-identical text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Reads a file and hashes its contents.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::from_bytes(&data))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::from_bytes(b"module top; endmodule");
        let b = ContentHash::from_bytes(b"module top; endmodule");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        let a = ContentHash::from_bytes(b"module a; endmodule");
        let b = ContentHash::from_bytes(b"module b; endmodule");
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_hex() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h}");
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn file_hash_matches_bytes() {
        let dir = std::env::temp_dir().join(format!("hdlrun_hash_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("top.v");
        std::fs::write(&path, b"module top; endmodule").unwrap();
        let from_file = ContentHash::from_file(&path).unwrap();
        assert_eq!(from_file, ContentHash::from_bytes(b"module top; endmodule"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn serde_roundtrip() {
        let h = ContentHash::from_bytes(b"serde test");
        let json = serde_json::to_string(&h).unwrap();
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}

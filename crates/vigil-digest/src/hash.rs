use std::fmt;

use serde::{Serialize, Serializer};
use sha2::{Digest as _, Sha256};

/// Fixed-size fingerprint of one physical line.
///
/// A `LineHash` is the SHA-256 of the line's raw bytes as read from disk,
/// line terminator included. Identical bytes always produce the same hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineHash([u8; 32]);

impl LineHash {
    /// Hash the raw bytes of a line.
    pub fn of(line: &[u8]) -> Self {
        let digest = Sha256::digest(line);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Lowercase hex representation, as stored in sidecar files.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let bytes = hex::decode(s).map_err(|e| HashError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(HashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for LineHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineHash({})", self.short_hex())
    }
}

impl fmt::Display for LineHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for LineHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors from parsing a hex-encoded line hash.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid hash length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(LineHash::of(b"same line\n"), LineHash::of(b"same line\n"));
    }

    #[test]
    fn terminator_is_part_of_the_hash() {
        assert_ne!(LineHash::of(b"abc\n"), LineHash::of(b"abc"));
        assert_ne!(LineHash::of(b"abc\n"), LineHash::of(b"abc\r\n"));
    }

    #[test]
    fn known_sha256_value() {
        // sha256("a\n")
        assert_eq!(
            LineHash::of(b"a\n").to_hex(),
            "87428fc522803d31065e7bce3cf03fe475096631e5e07bbd7a0fde60c4cf25c7"
        );
    }

    #[test]
    fn hex_roundtrip() {
        let hash = LineHash::of(b"line\n");
        assert_eq!(LineHash::from_hex(&hash.to_hex()).unwrap(), hash);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(
            LineHash::from_hex("zz"),
            Err(HashError::InvalidHex(_))
        ));
        assert_eq!(
            LineHash::from_hex("abcd"),
            Err(HashError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
    }

    #[test]
    fn serializes_as_hex_string() {
        let hash = LineHash::of(b"x\n");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
    }
}

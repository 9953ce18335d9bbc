//! Strong type definitions for Merklog.
//!
//! Identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Domain tag prepended to canonical leaf bytes before hashing.
pub const LEAF_DOMAIN: &[u8] = b"merklog-leaf-v0:";

/// Domain tag prepended to canonical node bytes before hashing.
pub const NODE_DOMAIN: &[u8] = b"merklog-node-v0:";

/// A 32-byte content identifier, computed as Blake3(domain || canonical_bytes(entry)).
///
/// Two entries with the same content always have the same ContentHash.
/// On the wire it travels as a 64-character lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Length of the hex encoding.
    pub const HEX_LEN: usize = 64;

    /// Hash `data` under the given domain tag.
    pub fn digest(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain);
        hasher.update(data);
        Self(*hasher.finalize().as_bytes())
    }

    /// Create a new ContentHash from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidHash(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    /// Abbreviated form for logs.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ContentHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for ContentHash {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_hex_roundtrip() {
        let hash = ContentHash::from_bytes([0x42; 32]);
        let hex = hash.to_hex();
        assert_eq!(hex.len(), ContentHash::HEX_LEN);
        assert_eq!(ContentHash::from_hex(&hex).unwrap(), hash);
    }

    #[test]
    fn test_content_hash_rejects_wrong_length() {
        assert!(ContentHash::from_hex("abcd").is_err());
        assert!(ContentHash::from_hex("zz").is_err());
    }

    #[test]
    fn test_domains_separate_digests() {
        let leaf = ContentHash::digest(LEAF_DOMAIN, b"payload");
        let node = ContentHash::digest(NODE_DOMAIN, b"payload");
        assert_ne!(leaf, node);
        assert_eq!(leaf, ContentHash::digest(LEAF_DOMAIN, b"payload"));
    }

    #[test]
    fn test_content_hash_display_is_full_hex() {
        let hash = ContentHash::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", hash), "ab".repeat(32));
        assert_eq!(format!("{:?}", hash), "ContentHash(abababababab)");
    }

    #[test]
    fn test_content_hash_serde_as_string() {
        let hash = ContentHash::from_bytes([0x01; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));

        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);

        assert!(serde_json::from_str::<ContentHash>("\"not-hex\"").is_err());
    }
}

//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical CBOR bytes of leaves and nodes. Every
//! peer must produce identical bytes, otherwise equal logs hash to different
//! roots and reconciliation never settles.

use merklog_core::types::{LEAF_DOMAIN, NODE_DOMAIN};
use merklog_core::{
    canonical_message_bytes, canonical_node_bytes, decode_message, ContentHash, Entry, Message,
    PeerId,
};

/// A golden leaf vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub timestamp: &'static str,
    pub author: &'static str,
    pub text: &'static str,
    /// Expected canonical bytes (hex).
    pub expected_bytes: &'static str,
}

impl GoldenVector {
    pub fn message(&self) -> Message {
        Message::with_timestamp(PeerId::new(self.author), self.text, self.timestamp)
    }
}

/// A golden node vector: child hashes given as repeated bytes.
#[derive(Debug, Clone)]
pub struct GoldenNodeVector {
    pub name: &'static str,
    pub children: &'static [u8],
    pub expected_bytes: &'static str,
}

impl GoldenNodeVector {
    pub fn children(&self) -> Vec<ContentHash> {
        self.children
            .iter()
            .map(|b| ContentHash::from_bytes([*b; 32]))
            .collect()
    }
}

/// Get all golden leaf vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "hello from connection 0",
            timestamp: "2026-01-14T12:00:00Z",
            author: "connection 0",
            text: "hello",
            expected_bytes: "a30074323032362d30312d31345431323a30303a30305a016c636f6e6e656374696f6e2030026568656c6c6f",
        },
        GoldenVector {
            name: "hi from connection 1",
            timestamp: "2026-01-14T12:00:00Z",
            author: "connection 1",
            text: "hi",
            expected_bytes: "a30074323032362d30312d31345431323a30303a30305a016c636f6e6e656374696f6e203102626869",
        },
        GoldenVector {
            name: "empty text at epoch",
            timestamp: "1970-01-01T00:00:00Z",
            author: "connection 2",
            text: "",
            expected_bytes: "a30074313937302d30312d30315430303a30303a30305a016c636f6e6e656374696f6e20320260",
        },
        GoldenVector {
            name: "multibyte utf-8 text",
            timestamp: "2026-01-14T12:00:01Z",
            author: "connection 3",
            text: "h\u{e9}llo w\u{f6}rld \u{2713}",
            expected_bytes: "a30074323032362d30312d31345431323a30303a30315a016c636f6e6e656374696f6e2033027168c3a96c6c6f2077c3b6726c6420e29c93",
        },
        GoldenVector {
            name: "text needing a one-byte length",
            timestamp: "2026-01-14T12:00:02Z",
            author: "connection 4",
            text: "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
            expected_bytes: "a30074323032362d30312d31345431323a30303a30325a016c636f6e6e656374696f6e203402781e787878787878787878787878787878787878787878787878787878787878",
        },
    ]
}

/// Get all golden node vectors.
pub fn node_vectors() -> Vec<GoldenNodeVector> {
    vec![
        GoldenNodeVector {
            name: "two children",
            children: &[0x11, 0x22],
            expected_bytes: "825820111111111111111111111111111111111111111111111111111111111111111158202222222222222222222222222222222222222222222222222222222222222222",
        },
        GoldenNodeVector {
            name: "single child",
            children: &[0xab],
            expected_bytes: "815820abababababababababababababababababababababababababababababababab",
        },
    ]
}

/// Check every vector: bytes, decode, and hash derivation.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let message = vector.message();
        let bytes = canonical_message_bytes(&message);
        if hex::encode(&bytes) != vector.expected_bytes {
            return Err(format!("{}: canonical bytes mismatch", vector.name));
        }

        let decoded = decode_message(&bytes).map_err(|e| format!("{}: {}", vector.name, e))?;
        if decoded != message {
            return Err(format!("{}: decode mismatch", vector.name));
        }

        if message.compute_hash() != ContentHash::digest(LEAF_DOMAIN, &bytes) {
            return Err(format!("{}: leaf hash mismatch", vector.name));
        }
    }

    for vector in node_vectors() {
        let children = vector.children();
        let bytes = canonical_node_bytes(&children);
        if hex::encode(&bytes) != vector.expected_bytes {
            return Err(format!("{}: canonical bytes mismatch", vector.name));
        }

        let entry = match children.as_slice() {
            [left, right] => Entry::node(*left, *right),
            [only] => Entry::Node {
                left: *only,
                right: None,
            },
            _ => return Err(format!("{}: bad child count", vector.name)),
        };
        if entry.compute_hash() != ContentHash::digest(NODE_DOMAIN, &bytes) {
            return Err(format!("{}: node hash mismatch", vector.name));
        }
    }

    Ok(())
}

//! Canonical CBOR encoding for deterministic hashing.
//!
//! This module implements the subset of RFC 8949 Core Deterministic Encoding
//! needed for tree entries:
//! - Map keys sorted by encoded byte comparison
//! - Integers and lengths use smallest valid encoding
//! - Definite lengths only
//!
//! The canonical encoding is the cross-peer contract: the same message must
//! produce identical bytes (and thus identical hashes) on every peer.

use ciborium::value::Value;

use crate::error::CoreError;
use crate::message::{Message, PeerId};
use crate::types::ContentHash;

/// Message field keys (integer keys for compact encoding).
mod keys {
    pub const TIMESTAMP: u64 = 0;
    pub const AUTHOR: u64 = 1;
    pub const TEXT: u64 = 2;
}

/// Encode a message to canonical CBOR bytes.
pub fn canonical_message_bytes(message: &Message) -> Vec<u8> {
    let value = message_to_cbor_value(message);
    encode_cbor_value_canonical(&value)
}

/// Encode the child list of an internal node to canonical CBOR bytes.
///
/// Format: array of 32-byte byte strings, in child order.
pub fn canonical_node_bytes(children: &[ContentHash]) -> Vec<u8> {
    let value = Value::Array(
        children
            .iter()
            .map(|c| Value::Bytes(c.0.to_vec()))
            .collect(),
    );
    encode_cbor_value_canonical(&value)
}

fn message_to_cbor_value(message: &Message) -> Value {
    Value::Map(vec![
        (
            Value::Integer(keys::TIMESTAMP.into()),
            Value::Text(message.timestamp.clone()),
        ),
        (
            Value::Integer(keys::AUTHOR.into()),
            Value::Text(message.author.as_str().to_string()),
        ),
        (
            Value::Integer(keys::TEXT.into()),
            Value::Text(message.text.clone()),
        ),
    ])
}

fn encode_cbor_value_canonical(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        _ => unreachable!("canonical values are built from messages and nodes only"),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

/// Decode a message from canonical bytes.
pub fn decode_message(bytes: &[u8]) -> Result<Message, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::DecodingError("expected map".into())),
    };

    let text_at = |key: u64| -> Result<String, CoreError> {
        map.iter()
            .find_map(|(k, v)| match (k, v) {
                (Value::Integer(i), Value::Text(s)) if i128::from(*i) == key as i128 => {
                    Some(s.clone())
                }
                _ => None,
            })
            .ok_or_else(|| CoreError::DecodingError(format!("missing text field {}", key)))
    };

    let message = Message {
        timestamp: text_at(keys::TIMESTAMP)?,
        author: PeerId::new(text_at(keys::AUTHOR)?),
        text: text_at(keys::TEXT)?,
    };

    // Reject non-canonical input so decode(encode(m)) is the only accepted form.
    if canonical_message_bytes(&message) != bytes {
        return Err(CoreError::DecodingError("non-canonical encoding".into()));
    }

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message::with_timestamp(PeerId::new("connection 0"), "hello", "2026-01-14T12:00:00Z")
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let msg = sample();
        assert_eq!(canonical_message_bytes(&msg), canonical_message_bytes(&msg));
    }

    #[test]
    fn test_message_layout() {
        let bytes = canonical_message_bytes(&sample());

        // Map header (3 entries), then key 0 and a 20-byte text string
        assert_eq!(bytes[0], 0xa3);
        assert_eq!(bytes[1], 0x00);
        assert_eq!(bytes[2], 0x60 | 20);
        assert_eq!(&bytes[3..23], b"2026-01-14T12:00:00Z");
        // key 1, 12-byte author
        assert_eq!(bytes[23], 0x01);
        assert_eq!(bytes[24], 0x60 | 12);
        assert_eq!(&bytes[25..37], b"connection 0");
        // key 2, 5-byte text
        assert_eq!(bytes[37], 0x02);
        assert_eq!(bytes[38], 0x65);
        assert_eq!(&bytes[39..], b"hello");
    }

    #[test]
    fn test_long_text_uses_wider_length() {
        let msg = Message::with_timestamp(PeerId::new("a"), "x".repeat(300), "t");
        let bytes = canonical_message_bytes(&msg);
        let tail = &bytes[bytes.len() - 303..];
        assert_eq!(&tail[..3], &[0x79, 0x01, 0x2c]);
    }

    #[test]
    fn test_node_layout() {
        let a = ContentHash::from_bytes([0x11; 32]);
        let b = ContentHash::from_bytes([0x22; 32]);
        let bytes = canonical_node_bytes(&[a, b]);

        assert_eq!(bytes.len(), 1 + 2 * (2 + 32));
        assert_eq!(bytes[0], 0x82);
        assert_eq!(&bytes[1..3], &[0x58, 32]);
        assert_eq!(&bytes[3..35], &[0x11; 32]);

        // Child order matters
        assert_ne!(bytes, canonical_node_bytes(&[b, a]));
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_map_key_ordering() {
        let mut buf = Vec::new();
        let entries = vec![
            (Value::Integer(2.into()), Value::Text("c".into())),
            (Value::Integer(0.into()), Value::Text("a".into())),
            (Value::Integer(1.into()), Value::Text("b".into())),
        ];
        encode_map_canonical(&mut buf, &entries);
        assert_eq!(buf, vec![0xa3, 0x00, 0x61, b'a', 0x01, 0x61, b'b', 0x02, 0x61, b'c']);
    }

    #[test]
    fn test_decode_message_roundtrip() {
        let msg = Message::with_timestamp(PeerId::new("p"), "héllo wörld", "2026-01-14T12:00:00+02:00");
        let decoded = decode_message(&canonical_message_bytes(&msg)).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_rejects_non_canonical() {
        // Same fields, keys out of order
        let mut bytes = vec![0xa3, 0x01, 0x61, b'p', 0x00, 0x61, b't', 0x02, 0x61, b'x'];
        assert!(decode_message(&bytes).is_err());

        bytes = vec![0x82, 0x00, 0x01];
        assert!(decode_message(&bytes).is_err());
    }
}

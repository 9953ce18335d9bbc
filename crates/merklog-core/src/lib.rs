//! # Merklog Core
//!
//! Pure primitives for Merklog: messages, content hashes, canonical encoding,
//! and the Merkle tree built over a peer's local log.
//!
//! This crate contains no I/O and no networking. It is pure computation
//! over content-addressed data structures.
//!
//! ## Key Types
//!
//! - [`Message`] - An immutable chat message `{timestamp, author, text}`
//! - [`ContentHash`] - Content-addressed identifier (Blake3 hash)
//! - [`Entry`] - A leaf (message) or internal node (child hashes)
//! - [`MerkleTree`] - Root hash plus the entry store derived from a log
//! - [`LocalLog`] - The ordered, deduplicated messages owned by one peer
//!
//! ## Canonicalization
//!
//! Entries are hashed over deterministic CBOR. See [`canonical`] module.
//! Every peer must use the same encoding, otherwise equal content produces
//! different hashes and reconciliation never terminates.

pub mod canonical;
pub mod entry;
pub mod error;
pub mod log;
pub mod message;
pub mod tree;
pub mod types;

pub use canonical::{canonical_message_bytes, canonical_node_bytes, decode_message};
pub use entry::Entry;
pub use error::{CoreError, Result};
pub use log::{AppendResult, LocalLog, Snapshot};
pub use message::{Message, PeerId};
pub use tree::{compute_root, EntryStore, MerkleTree};
pub use types::ContentHash;

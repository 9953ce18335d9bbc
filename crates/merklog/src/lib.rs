//! # Merklog
//!
//! Peers that keep append-only message logs converged through Merkle-tree
//! anti-entropy over a shared publish/subscribe bus.
//!
//! ## Overview
//!
//! - **Messages**: Immutable `{timestamp, author, text}` records
//! - **Logs**: Each peer's own arrival-ordered, deduplicated list of messages
//! - **Roots**: A Merkle root summarizing a log; equal roots mean equal sets
//! - **Sync**: Peers compare roots and fetch only the subtrees they lack
//!
//! ## Usage
//!
//! ```rust
//! use merklog::{MemoryBus, Peer, PeerConfig, PeerId};
//!
//! let bus = MemoryBus::shared();
//! let a = Peer::new(PeerId::from_index(0), bus.clone(), PeerConfig::default());
//! let b = Peer::new(PeerId::from_index(1), bus.clone(), PeerConfig::default());
//!
//! b.send_message("hi").unwrap();
//!
//! assert_eq!(a.messages().len(), 1);
//! assert_eq!(a.root_hash(), b.root_hash());
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `merklog::core` - Core primitives (Message, ContentHash, MerkleTree, etc.)
//! - `merklog::sync` - Sync protocol, events and buses

pub mod error;
pub mod peer;

// Re-export component crates
pub use merklog_core as core;
pub use merklog_sync as sync;

// Re-export main types for convenience
pub use error::{PeerError, Result};
pub use peer::{ListenerId, LogListener, Peer, PeerConfig};

// Re-export commonly used types
pub use merklog_core::{ContentHash, LocalLog, MerkleTree, Message, PeerId, Snapshot};
pub use merklog_sync::{Bus, ChannelBus, MemoryBus, SyncConfig, SyncEvent};

//! # Merklog Sync
//!
//! Anti-entropy protocol for converging message logs between peers.
//!
//! ## Overview
//!
//! Every peer subscribes to the four channels of a shared broadcast [`Bus`]
//! and publishes on it, including to itself. Peers advertise the root hash of
//! the Merkle tree over their log. A peer seeing a root it does not share asks
//! for that hash and walks down the tree one `query` at a time, fetching only
//! the subtrees it lacks, until the missing messages arrive.
//!
//! ## Key Properties
//!
//! - **Idempotent**: Every handler tolerates duplicate delivery
//! - **Order-insensitive**: Roots depend on the message set, not arrival order
//! - **Stateless**: Nothing survives between events except the log itself
//! - **Bandwidth-efficient**: Only divergent subtrees are exchanged
//!
//! ## Usage
//!
//! ```rust
//! use merklog_core::{Message, PeerId};
//! use merklog_sync::{Replica, SyncConfig, SyncEvent};
//!
//! let mut a = Replica::new(PeerId::from_index(0), SyncConfig::default());
//! let mut b = Replica::new(PeerId::from_index(1), SyncConfig::default());
//!
//! b.append_local(Message::new(PeerId::from_index(1), "hi"));
//! let root = b.root_event();
//!
//! // A does not share B's root, so it asks for it
//! let step = a.handle(&root);
//! assert!(matches!(step.outbound[0], SyncEvent::Query(_)));
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Peer A (empty)                       Peer B {hi}
//!   |<------- root(h) ------------------|
//!   |-------- query(h) ---------------->|
//!   |<------- message(hi) --------------|
//!   (A appends; both roots now equal h)
//! ```
//!
//! With larger logs `query(h)` resolves to `node([left, right])` and the
//! requester queries only the children it does not already hold.

pub mod convergence;
pub mod error;
pub mod messages;
pub mod protocol;
pub mod transport;

pub use convergence::{missing_leaves, verify_convergence, verify_mesh, ConvergenceResult};
pub use error::{Result, SyncError};
pub use messages::{limits, Channel, SyncEvent};
pub use protocol::{on_node, on_query, on_root, Replica, Step, SyncConfig};
pub use transport::{
    channel::ChannelBus, memory::MemoryBus, Bus, Subscriber, SubscriptionId,
};

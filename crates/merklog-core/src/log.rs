//! LocalLog: the ordered message sequence owned by one peer.
//!
//! Messages are kept in arrival order. Appends are idempotent: a message
//! structurally equal to one already present is rejected as a duplicate.

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

use crate::message::Message;
use crate::tree::{compute_root, MerkleTree};
use crate::types::ContentHash;

/// Result of appending a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResult {
    /// Message was new and is now the last element of the log.
    Appended,
    /// Message already exists (idempotent - not an error).
    Duplicate,
}

impl AppendResult {
    pub fn is_appended(self) -> bool {
        matches!(self, AppendResult::Appended)
    }
}

/// An immutable copy of a log's messages, cheap to clone and hand out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot(Arc<[Message]>);

impl Snapshot {
    pub fn to_vec(&self) -> Vec<Message> {
        self.0.to_vec()
    }
}

impl Deref for Snapshot {
    type Target = [Message];

    fn deref(&self) -> &[Message] {
        &self.0
    }
}

impl From<Vec<Message>> for Snapshot {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages.into())
    }
}

/// The append-only log of one peer.
#[derive(Debug, Clone, Default)]
pub struct LocalLog {
    /// Messages in arrival order.
    messages: Vec<Message>,

    /// Leaf hashes of every message, for structural dedup.
    index: HashSet<ContentHash>,
}

impl LocalLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message unless an equal one is already present.
    pub fn append(&mut self, message: Message) -> AppendResult {
        if !self.index.insert(message.compute_hash()) {
            return AppendResult::Duplicate;
        }
        self.messages.push(message);
        AppendResult::Appended
    }

    pub fn contains(&self, message: &Message) -> bool {
        self.index.contains(&message.compute_hash())
    }

    /// Check for a message by its leaf hash.
    pub fn contains_hash(&self, hash: &ContentHash) -> bool {
        self.index.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Copy the current contents into an immutable snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.messages.as_slice().into())
    }

    /// Build the Merkle tree over the current contents.
    pub fn compute_tree(&self) -> MerkleTree {
        compute_root(&self.messages)
    }
}

impl FromIterator<Message> for LocalLog {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        let mut log = LocalLog::new();
        for message in iter {
            log.append(message);
        }
        log
    }
}

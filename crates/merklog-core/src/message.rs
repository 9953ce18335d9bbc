//! Message: the atomic unit of a peer's log.
//!
//! A message is an immutable value. Two structurally equal messages are the
//! same message no matter which peer created or relayed them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::canonical_message_bytes;
use crate::types::{ContentHash, LEAF_DOMAIN};

/// Identifier of a peer, used as the author of the messages it sends.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer identifier from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The conventional identifier for the `index`-th peer of a mesh.
    pub fn from_index(index: usize) -> Self {
        Self(format!("connection {}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// ISO-8601 timestamp claimed by the author. Untrusted.
    pub timestamp: String,

    /// The authoring peer.
    pub author: PeerId,

    /// UTF-8 body.
    pub text: String,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(author: PeerId, text: impl Into<String>) -> Self {
        Self::at(author, text, Utc::now())
    }

    /// Create a message stamped with the given instant.
    pub fn at(author: PeerId, text: impl Into<String>, when: DateTime<Utc>) -> Self {
        Self {
            timestamp: when.to_rfc3339_opts(SecondsFormat::Millis, true),
            author,
            text: text.into(),
        }
    }

    /// Create a message with an explicit timestamp string.
    pub fn with_timestamp(
        author: PeerId,
        text: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            author,
            text: text.into(),
        }
    }

    /// Compute the content hash of this message as a tree leaf.
    pub fn compute_hash(&self) -> ContentHash {
        ContentHash::digest(LEAF_DOMAIN, &canonical_message_bytes(self))
    }
}

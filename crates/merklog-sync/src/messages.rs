//! Sync protocol event types.
//!
//! Four channels, each carrying one payload type. Events travel by value;
//! a networked transport encodes them with [`SyncEvent::to_cbor`] or the
//! JSON form `{"channel": "...", "payload": ...}`.

use serde::{Deserialize, Serialize};
use std::fmt;

use merklog_core::{ContentHash, Message};

use crate::error::{Result, SyncError};

/// Event size limits.
pub mod limits {
    /// Max child hashes in a `node` event.
    pub const MAX_NODE_CHILDREN: usize = 2;
}

/// A named bus channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Root,
    Query,
    Node,
    Message,
}

impl Channel {
    /// Every channel, in the order peers subscribe to them.
    pub const ALL: [Channel; 4] = [Channel::Root, Channel::Query, Channel::Node, Channel::Message];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Root => "root",
            Channel::Query => "query",
            Channel::Node => "node",
            Channel::Message => "message",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sync protocol events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "lowercase")]
pub enum SyncEvent {
    /// State advertisement: the publisher's root hash (`None` for an empty log).
    Root(Option<ContentHash>),

    /// Request for the entry stored under a hash.
    Query(ContentHash),

    /// Answer to a query that resolved to an internal node: its children.
    Node(Vec<ContentHash>),

    /// Answer to a query that resolved to a leaf.
    Message(Message),
}

impl SyncEvent {
    /// The channel this event is published on.
    pub fn channel(&self) -> Channel {
        match self {
            SyncEvent::Root(_) => Channel::Root,
            SyncEvent::Query(_) => Channel::Query,
            SyncEvent::Node(_) => Channel::Node,
            SyncEvent::Message(_) => Channel::Message,
        }
    }

    /// Check if this event respects size limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        if let SyncEvent::Node(children) = self {
            if children.is_empty() {
                return Err("node event without children");
            }
            if children.len() > limits::MAX_NODE_CHILDREN {
                return Err("too many node children");
            }
        }
        Ok(())
    }

    /// Encode as CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| SyncError::Codec(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR and check limits.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let event: SyncEvent =
            ciborium::from_reader(bytes).map_err(|e| SyncError::Codec(e.to_string()))?;
        event.validated()
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SyncError::Codec(e.to_string()))
    }

    /// Decode from JSON and check limits.
    pub fn from_json(s: &str) -> Result<Self> {
        let event: SyncEvent =
            serde_json::from_str(s).map_err(|e| SyncError::Codec(e.to_string()))?;
        event.validated()
    }

    fn validated(self) -> Result<Self> {
        self.validate_limits()
            .map_err(|reason| SyncError::InvalidEvent(reason.to_string()))?;
        Ok(self)
    }
}

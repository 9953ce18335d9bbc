//! Tree entries: leaves hold messages, nodes hold child hashes.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_node_bytes;
use crate::message::Message;
use crate::types::{ContentHash, NODE_DOMAIN};

/// An entry of the Merkle tree, keyed by its own [`ContentHash`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    /// A message at the bottom of the tree.
    Leaf(Message),

    /// An internal node. The tree builder always pairs children, but a node
    /// with a single child is still a valid entry and hashes distinctly.
    Node {
        left: ContentHash,
        right: Option<ContentHash>,
    },
}

impl Entry {
    /// Create a node over two children.
    pub fn node(left: ContentHash, right: ContentHash) -> Self {
        Entry::Node {
            left,
            right: Some(right),
        }
    }

    /// Compute the content hash of this entry.
    pub fn compute_hash(&self) -> ContentHash {
        match self {
            Entry::Leaf(message) => message.compute_hash(),
            Entry::Node { .. } => {
                ContentHash::digest(NODE_DOMAIN, &canonical_node_bytes(&self.children()))
            }
        }
    }

    /// Child hashes in order; empty for a leaf.
    pub fn children(&self) -> Vec<ContentHash> {
        match self {
            Entry::Leaf(_) => Vec::new(),
            Entry::Node { left, right } => std::iter::once(*left).chain(*right).collect(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Entry::Leaf(_))
    }

    /// The message held by a leaf.
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Entry::Leaf(message) => Some(message),
            Entry::Node { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PeerId;

    #[test]
    fn test_leaf_hash_matches_message_hash() {
        let msg = Message::with_timestamp(PeerId::new("a"), "hi", "t");
        let leaf = Entry::Leaf(msg.clone());
        assert_eq!(leaf.compute_hash(), msg.compute_hash());
        assert!(leaf.children().is_empty());
        assert_eq!(leaf.as_message(), Some(&msg));
    }

    #[test]
    fn test_node_children_order() {
        let a = ContentHash::from_bytes([1; 32]);
        let b = ContentHash::from_bytes([2; 32]);

        let ab = Entry::node(a, b);
        assert_eq!(ab.children(), vec![a, b]);
        assert_ne!(ab.compute_hash(), Entry::node(b, a).compute_hash());
    }

    #[test]
    fn test_single_child_node_differs_from_child() {
        let a = ContentHash::from_bytes([1; 32]);
        let single = Entry::Node { left: a, right: None };
        assert_eq!(single.children(), vec![a]);
        assert_ne!(single.compute_hash(), a);
        assert!(!single.is_leaf());
    }
}

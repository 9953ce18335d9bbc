//! Merkle tree construction over a peer's log.
//!
//! The tree is a derived cache: it is rebuilt from scratch from the current
//! messages, never updated in place, and can be discarded at any time.
//!
//! Algorithm:
//! 1. Hash every message as a leaf and record `hash -> Leaf(message)`
//! 2. Sort the leaf hashes ascending and drop duplicates (canonical order)
//! 3. Pair consecutive hashes `(a, b)` into `Node(a, b)` and record it;
//!    an odd trailing hash is carried into the next level as itself
//! 4. Repeat until one hash remains: the root (`None` for an empty log)

use std::collections::HashMap;

use crate::entry::Entry;
use crate::message::Message;
use crate::types::ContentHash;

/// Mapping from content hash to entry, covering every leaf and node of a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryStore {
    entries: HashMap<ContentHash, Entry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry by hash.
    pub fn get(&self, hash: &ContentHash) -> Option<&Entry> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContentHash, &Entry)> {
        self.entries.iter()
    }

    /// Number of leaf entries.
    pub fn leaf_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_leaf()).count()
    }

    /// Number of internal node entries.
    pub fn node_count(&self) -> usize {
        self.entries.len() - self.leaf_count()
    }

    fn insert(&mut self, entry: Entry) -> ContentHash {
        let hash = entry.compute_hash();
        self.entries.insert(hash, entry);
        hash
    }
}

/// The result of hashing a log: its root and every entry below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleTree {
    root: Option<ContentHash>,
    store: EntryStore,
    leaves: Vec<ContentHash>,
    levels: usize,
}

impl MerkleTree {
    /// Root hash, `None` for an empty log.
    pub fn root(&self) -> Option<ContentHash> {
        self.root
    }

    /// Look up an entry by hash.
    pub fn get(&self, hash: &ContentHash) -> Option<&Entry> {
        self.store.get(hash)
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.store.contains(hash)
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Leaf hashes in canonical (ascending) order.
    pub fn leaves(&self) -> &[ContentHash] {
        &self.leaves
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn node_count(&self) -> usize {
        self.store.len() - self.leaves.len()
    }

    /// Number of pairing rounds between the leaves and the root.
    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

/// Build the Merkle tree for a list of messages.
///
/// The result depends only on the set of messages, not on their order.
pub fn compute_root(messages: &[Message]) -> MerkleTree {
    let mut store = EntryStore::new();

    let mut leaves: Vec<ContentHash> = messages
        .iter()
        .map(|m| store.insert(Entry::Leaf(m.clone())))
        .collect();
    leaves.sort_unstable();
    leaves.dedup();

    let mut level = leaves.clone();
    let mut levels = 0;
    while level.len() > 1 {
        level = pair_level(&level, &mut store);
        levels += 1;
    }

    MerkleTree {
        root: level.first().copied(),
        store,
        leaves,
        levels,
    }
}

fn pair_level(hashes: &[ContentHash], store: &mut EntryStore) -> Vec<ContentHash> {
    hashes
        .chunks(2)
        .map(|chunk| match *chunk {
            [left, right] => store.insert(Entry::node(left, right)),
            [odd] => odd,
            _ => unreachable!("chunks(2) yields one or two hashes"),
        })
        .collect()
}

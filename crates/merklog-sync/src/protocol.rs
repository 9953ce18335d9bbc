//! Sync protocol state machine.
//!
//! The handlers are pure functions from (tree, event) to outbound events.
//! [`Replica`] applies them to one peer's log and keeps the derived tree
//! cached until the next append.
//!
//! | Event         | Action                                                         |
//! |---------------|----------------------------------------------------------------|
//! | `root(h)`     | local root differs from `h`: publish `query(h)`                |
//! | `query(h)`    | leaf: publish `message(m)`; node: publish `node([l, r])`       |
//! | `node(cs)`    | publish `query(c)` for each child missing locally              |
//! | `message(m)`  | append `m` unless already present                              |

use merklog_core::{AppendResult, ContentHash, Entry, LocalLog, MerkleTree, Message, PeerId};

use crate::messages::SyncEvent;

/// Configuration for sync behavior.
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Re-advertise the root after absorbing a gossiped message.
    ///
    /// Off by default: only local sends start a reconciliation, so a third
    /// peer missing a gossiped message waits for the next send. Turning it on
    /// lets every mutation re-drive the mesh to full convergence.
    pub rebroadcast_on_gossip: bool,
}

/// Outcome of handling one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    /// Events to publish on the bus.
    pub outbound: Vec<SyncEvent>,
    /// The message appended to the log, if any.
    pub appended: Option<Message>,
}

impl Step {
    fn publish(outbound: Vec<SyncEvent>) -> Self {
        Self {
            outbound,
            appended: None,
        }
    }

    /// Whether the log changed while handling the event.
    pub fn log_changed(&self) -> bool {
        self.appended.is_some()
    }
}

/// Compare a foreign root to the local one.
///
/// A null foreign root is never queried: no peer can resolve it.
pub fn on_root(tree: &MerkleTree, root: Option<ContentHash>) -> Vec<SyncEvent> {
    match root {
        Some(hash) if tree.root() != Some(hash) => vec![SyncEvent::Query(hash)],
        _ => Vec::new(),
    }
}

/// Answer a query from the local entry store.
pub fn on_query(tree: &MerkleTree, hash: &ContentHash) -> Vec<SyncEvent> {
    match tree.get(hash) {
        Some(Entry::Leaf(message)) => vec![SyncEvent::Message(message.clone())],
        Some(node @ Entry::Node { .. }) => vec![SyncEvent::Node(node.children())],
        None => Vec::new(),
    }
}

/// Query every child of a foreign node that is not held locally.
pub fn on_node(tree: &MerkleTree, children: &[ContentHash]) -> Vec<SyncEvent> {
    children
        .iter()
        .filter(|child| !tree.contains(child))
        .map(|child| SyncEvent::Query(*child))
        .collect()
}

/// One peer's protocol state: its log plus the cached tree over it.
#[derive(Debug, Clone)]
pub struct Replica {
    id: PeerId,
    log: LocalLog,
    tree: Option<MerkleTree>,
    config: SyncConfig,
}

impl Replica {
    /// Create a replica with an empty log.
    pub fn new(id: PeerId, config: SyncConfig) -> Self {
        Self::with_log(id, LocalLog::new(), config)
    }

    /// Create a replica over an existing log.
    pub fn with_log(id: PeerId, log: LocalLog, config: SyncConfig) -> Self {
        Self {
            id,
            log,
            tree: None,
            config,
        }
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn log(&self) -> &LocalLog {
        &self.log
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The tree over the current log, rebuilt if the log changed.
    pub fn tree(&mut self) -> &MerkleTree {
        self.tree.get_or_insert_with(|| self.log.compute_tree())
    }

    pub fn root_hash(&mut self) -> Option<ContentHash> {
        self.tree().root()
    }

    /// The `root` advertisement for the current log.
    pub fn root_event(&mut self) -> SyncEvent {
        SyncEvent::Root(self.root_hash())
    }

    /// Append a locally authored message.
    pub fn append_local(&mut self, message: Message) -> AppendResult {
        self.append(message)
    }

    /// Handle one event from the bus.
    pub fn handle(&mut self, event: &SyncEvent) -> Step {
        if let Err(reason) = event.validate_limits() {
            tracing::warn!("{}: dropping invalid {} event: {}", self.id, event.channel(), reason);
            return Step::default();
        }

        match event {
            SyncEvent::Root(root) => {
                let outbound = on_root(self.tree(), *root);
                if outbound.is_empty() {
                    tracing::trace!("{}: root {:?} needs no query", self.id, root);
                }
                Step::publish(outbound)
            }
            SyncEvent::Query(hash) => {
                let outbound = on_query(self.tree(), hash);
                if outbound.is_empty() {
                    tracing::trace!("{}: cannot resolve {:?}", self.id, hash);
                } else {
                    tracing::debug!("{}: answering query {:?}", self.id, hash);
                }
                Step::publish(outbound)
            }
            SyncEvent::Node(children) => Step::publish(on_node(self.tree(), children)),
            SyncEvent::Message(message) => self.absorb(message),
        }
    }

    fn absorb(&mut self, message: &Message) -> Step {
        if self.append(message.clone()) == AppendResult::Duplicate {
            return Step::default();
        }

        tracing::debug!(
            "{}: appended message from {} ({} total)",
            self.id,
            message.author,
            self.log.len()
        );

        let outbound = if self.config.rebroadcast_on_gossip {
            vec![self.root_event()]
        } else {
            Vec::new()
        };

        Step {
            outbound,
            appended: Some(message.clone()),
        }
    }

    fn append(&mut self, message: Message) -> AppendResult {
        let result = self.log.append(message);
        if result.is_appended() {
            self.tree = None;
        }
        result
    }
}

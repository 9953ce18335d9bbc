//! Convergence verification for the sync protocol.
//!
//! Two peers have converged when their root hashes are equal. Because the
//! root depends only on the message set, equal roots mean equal logs as sets.

use merklog_core::{ContentHash, Entry, MerkleTree, Message};

/// Result of convergence verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Both sides hold the same message set.
    Converged,
    /// Roots differ (may need more sync rounds).
    Diverged {
        local: Option<ContentHash>,
        remote: Option<ContentHash>,
    },
}

impl ConvergenceResult {
    /// Check if the peers have converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged)
    }
}

/// Compare a local root against a remote one.
pub fn verify_convergence(
    local: Option<ContentHash>,
    remote: Option<ContentHash>,
) -> ConvergenceResult {
    if local == remote {
        ConvergenceResult::Converged
    } else {
        ConvergenceResult::Diverged { local, remote }
    }
}

/// Check that every root in a mesh matches the first.
///
/// Reports the first root that differs.
pub fn verify_mesh(roots: &[Option<ContentHash>]) -> ConvergenceResult {
    let Some((first, rest)) = roots.split_first() else {
        return ConvergenceResult::Converged;
    };

    rest.iter()
        .map(|root| verify_convergence(*first, *root))
        .find(|result| !result.is_converged())
        .unwrap_or(ConvergenceResult::Converged)
}

/// Messages reachable from the remote root that the local tree lacks.
///
/// Walks the remote tree the way `query` events would: a subtree whose hash
/// the local tree already holds is skipped whole, since equal hashes imply
/// equal contents below them.
pub fn missing_leaves(local: &MerkleTree, remote: &MerkleTree) -> Vec<Message> {
    let mut missing = Vec::new();
    let mut pending: Vec<ContentHash> = remote.root().into_iter().collect();

    while let Some(hash) = pending.pop() {
        if local.contains(&hash) {
            continue;
        }
        match remote.get(&hash) {
            Some(Entry::Leaf(message)) => missing.push(message.clone()),
            Some(node @ Entry::Node { .. }) => {
                // Reverse so the left child is visited first
                pending.extend(node.children().into_iter().rev());
            }
            None => {}
        }
    }

    missing
}

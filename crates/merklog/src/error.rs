//! Error types for peers.

use thiserror::Error;

/// Errors that can occur during peer operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeerError {
    /// The peer was shut down and no longer takes part in sync.
    #[error("peer {0} is shut down")]
    ShutDown(String),
}

/// Result type for peer operations.
pub type Result<T> = std::result::Result<T, PeerError>;

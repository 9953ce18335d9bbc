//! Error types for the sync module.

use thiserror::Error;

/// Errors raised at the edges of the protocol.
///
/// The protocol handlers themselves never fail: unknown hashes, duplicates
/// and stale roots are no-ops. Errors only come from decoding events off a
/// wire or from setting up a transport.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Event could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Event decoded but violates protocol limits.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

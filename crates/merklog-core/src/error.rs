//! Error types for Merklog Core.

use thiserror::Error;

/// Errors raised when parsing or decoding core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

impl From<hex::FromHexError> for CoreError {
    fn from(e: hex::FromHexError) -> Self {
        CoreError::InvalidHash(e.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

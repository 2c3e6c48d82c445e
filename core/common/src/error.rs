//! Common error types for Drift.

use thiserror::Error;

/// Top-level error type for Drift operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Queue store or record store operation failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Remote endpoint call failed (timeout, connection, non-2xx).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

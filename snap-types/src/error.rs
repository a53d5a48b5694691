//! Error types for blindsnap wire types.

use thiserror::Error;

/// Errors that can occur while handling wire types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Snapshot id was not 24 lowercase hex characters
    #[error("invalid snapshot id: {0}")]
    InvalidId(String),

    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
}

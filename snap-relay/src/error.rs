//! Error types for snap-relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snap_types::{ErrorBody, TypesError};

/// Main error type for snap-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Request failed validation.
    #[error("{0}")]
    Validation(String),

    /// Missing or mismatched API key.
    #[error("unauthorized")]
    Unauthorized,

    /// Snapshot not found.
    #[error("snapshot not found: {id}")]
    NotFound {
        /// The id that was requested.
        id: String,
    },

    /// Unexpected failure inside a handler.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// WAL file I/O failed.
    #[error("wal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] TypesError),

    /// A record with this id already exists.
    #[error("duplicate snapshot id: {id}")]
    DuplicateId {
        /// The colliding id.
        id: String,
    },
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

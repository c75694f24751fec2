//! Error taxonomy for store operations.

use thiserror::Error;
use tidemark_filter::FilterError;
use tidemark_protocol::NetworkError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// Configuration and usage errors are raised before any I/O. Backend
/// errors keep their full structure (category, code, status) so callers
/// can branch programmatically.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation is invalid for the store's mode or current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// A batch operation was called with no entities.
    #[error("batch must contain at least one entity")]
    EmptyBatch,

    /// The session's API version does not support the operation.
    #[error("operation requires API version {required}, session uses {actual}")]
    ApiVersionUnsupported {
        /// Minimum API version for the operation.
        required: u32,
        /// The session's configured API version.
        actual: u32,
    },

    /// No cached entity exists under the given ID.
    #[error("entity not found in cache: {entity_id}")]
    EntityNotFound {
        /// The entity ID that was not found.
        entity_id: String,
    },

    /// The filter expression is unsupported or missing a required clause.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The backend returned an error response.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// A payload did not match the expected entity shape.
    #[error("parse error: {message}")]
    Parse {
        /// Description of the shape mismatch.
        message: String,
    },

    /// The local cache storage failed; fatal for the operation.
    #[error("cache storage error: {message}")]
    Cache {
        /// Description of the failure.
        message: String,
    },

    /// The sync queue storage failed; fatal for the operation.
    #[error("sync queue storage error: {message}")]
    Queue {
        /// Description of the failure.
        message: String,
    },

    /// The session has been closed.
    #[error("session is closed")]
    SessionClosed,

    /// The operation was cancelled cooperatively.
    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// Creates an invalid-operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a cache storage error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Creates a sync queue storage error.
    pub fn queue(message: impl Into<String>) -> Self {
        Self::Queue {
            message: message.into(),
        }
    }

    /// Creates an entity-not-found error.
    pub fn entity_not_found(entity_id: impl Into<String>) -> Self {
        Self::EntityNotFound {
            entity_id: entity_id.into(),
        }
    }

    /// Returns true if the error came from the network layer.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns true if the error is a not-found response, from either
    /// the backend or the local cache.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::EntityNotFound { .. } => true,
            Self::Network(err) => err.is_not_found(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}

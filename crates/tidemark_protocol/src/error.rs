//! Structured network errors.

use thiserror::Error;

/// Result type for network operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Category of a backend error, for programmatic branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unclassified backend failure.
    General,
    /// The request was malformed or semantically invalid.
    BadRequest,
    /// The caller lacks permission for the operation.
    Unauthorized,
    /// The addressed entity or collection does not exist.
    NotFound,
    /// The write conflicted with backend state.
    Conflict,
    /// The backend does not support the requested protocol feature
    /// (e.g. server-side delta queries).
    FeatureUnavailable,
}

/// An error returned by the remote backend or the transport beneath it.
///
/// Every propagated error carries enough structure for the caller to
/// branch programmatically: a category, the backend's raw code, and the
/// HTTP status when one was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("network error [{code}]: {message}")]
pub struct NetworkError {
    /// HTTP-style status code, when the backend responded.
    pub status: Option<u16>,
    /// Error category.
    pub category: ErrorCategory,
    /// Backend's raw error code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl NetworkError {
    /// Creates an error with an explicit category and status.
    pub fn new(
        status: Option<u16>,
        category: ErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a general transport-level failure (no HTTP response).
    pub fn general(message: impl Into<String>) -> Self {
        Self::new(None, ErrorCategory::General, "NetworkError", message)
    }

    /// Creates a bad-request error.
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Some(400), ErrorCategory::BadRequest, code, message)
    }

    /// Creates an insufficient-permissions error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            Some(401),
            ErrorCategory::Unauthorized,
            "InsufficientCredentials",
            message,
        )
    }

    /// Creates a not-found error for an entity.
    pub fn entity_not_found(entity_id: &str) -> Self {
        Self::new(
            Some(404),
            ErrorCategory::NotFound,
            "EntityNotFound",
            format!("entity {entity_id} was not found"),
        )
    }

    /// Creates an error signalling that server-side delta queries are
    /// unavailable for the collection.
    pub fn delta_unavailable() -> Self {
        Self::new(
            Some(403),
            ErrorCategory::FeatureUnavailable,
            "MissingConfiguration",
            "delta queries are not enabled for this collection",
        )
    }

    /// Returns true if the error is a not-found response.
    pub fn is_not_found(&self) -> bool {
        self.category == ErrorCategory::NotFound
    }

    /// Returns true if the error signals an unavailable protocol feature.
    pub fn is_feature_unavailable(&self) -> bool {
        self.category == ErrorCategory::FeatureUnavailable
    }
}

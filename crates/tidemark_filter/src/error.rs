//! Error types for filter construction and translation.

use thiserror::Error;

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors raised while translating or validating a query.
///
/// These errors surface at the point a filter expression is translated,
/// before any network or cache I/O happens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// The query contains no evaluable predicate where one is required.
    #[error("filter has no evaluable where clause")]
    WhereClauseAbsent,

    /// The translator does not support an operator used in the filter.
    #[error("unsupported filter operator: {operator}")]
    UnsupportedOperator {
        /// Name of the unsupported operator.
        operator: String,
    },

    /// A filter value cannot be represented by the target backend.
    #[error("invalid filter value: {message}")]
    InvalidValue {
        /// Description of the problem.
        message: String,
    },
}

impl FilterError {
    /// Creates an unsupported-operator error.
    pub fn unsupported(operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
        }
    }

    /// Creates an invalid-value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }
}

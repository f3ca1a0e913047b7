//! # Errors
//!
//! Error type returned by [`ParameterStore`](crate::ParameterStore) operations.

use thiserror::Error;

/// Result alias for store operations
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The local name is not present under the store prefix
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key tree lists the parameter but the backend no longer has it
    #[error("parameter not found in backend: {0}")]
    ParameterNotFound(String),

    /// Names are single path segments
    #[error("invalid parameter name {0:?}: must be non-empty and must not contain '/'")]
    InvalidName(String),

    /// The store is read-only
    #[error("operation not supported by a read-only parameter store: {0}")]
    NotImplemented(&'static str),

    /// A resolved name was a prefix where a value was expected, or vice versa
    #[error("{name} is a {found}, expected a {expected}")]
    UnexpectedKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Listing or fetch failure, surfaced verbatim from the backend
    #[error("backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether this error means "the name does not exist" rather than a failure
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::KeyNotFound(_) | StoreError::ParameterNotFound(_)
        )
    }
}

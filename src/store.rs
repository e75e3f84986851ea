//! External store errors.
//!
//! Shared by every collaborator contract backed by the document database: cart
//! collection, catalog, coupons and orders.

use thiserror::Error;

/// Failure reported by an external document store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Network or availability failure; the same call may succeed if retried.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The signed-in user is not allowed to perform this operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The referenced document does not exist.
    #[error("document not found")]
    NotFound,
}

impl StoreError {
    /// Whether retrying the same call could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

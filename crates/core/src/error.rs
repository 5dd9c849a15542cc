//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, ownership, stock). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced product, cart, cart line or order does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The identity is known but does not own the referenced resource.
    #[error("forbidden")]
    Forbidden,

    /// A quantity was below 1.
    #[error("invalid quantity {0}: must be at least 1")]
    InvalidQuantity(i64),

    /// A reservation asked for more stock than is available.
    #[error("out of stock: requested {requested}, available {available}")]
    OutOfStock { requested: i64, available: i64 },

    /// A conflict occurred (e.g. a lock could not be acquired in time).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authorization failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound(entity)
    }

    pub fn out_of_stock(requested: i64, available: i64) -> Self {
        Self::OutOfStock {
            requested,
            available,
        }
    }
}

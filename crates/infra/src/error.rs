use thiserror::Error;

use shopledger_core::{DomainError, ProductId};

pub type StoreResult<T> = Result<T, StoreError>;

/// Ledger store operation error.
///
/// These are storage failures (missing rows, lost races, constraint
/// rejections, backend outages) as opposed to domain errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// A competing write won (lot drained concurrently, duplicate key).
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// The backend rejected a row (check or foreign-key constraint).
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Connection, pool or decoding failure. Retryable.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Error surfaced by ledger services.
///
/// Joins [`DomainError`] and [`StoreError`] into the categories callers act
/// on; the HTTP layer maps each variant to one status code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// Lost a race or hit a uniqueness rule; re-read and retry the whole operation.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::InsufficientStock { .. } | ServiceError::Conflict(_) | ServiceError::Persistence(_)
        )
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::NotFound(msg) => ServiceError::NotFound(msg),
            DomainError::InsufficientStock {
                product_id,
                requested,
                available,
            } => ServiceError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            StoreError::Concurrency(msg) => ServiceError::Conflict(msg),
            StoreError::Constraint(msg) => ServiceError::Validation(msg),
            StoreError::Backend(msg) => ServiceError::Persistence(msg),
        }
    }
}

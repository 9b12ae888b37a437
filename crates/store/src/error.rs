//! Store error types.

use common::ProductId;
use thiserror::Error;

/// Errors surfaced by the storage adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A conditional stock decrement found fewer units than requested.
    /// The surrounding transaction has been rolled back.
    #[error("Insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// The unique email constraint rejected a user insert.
    #[error("Email is already registered")]
    DuplicateEmail,

    /// A stored value could not be mapped onto the data model.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Convenience alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

//! Shop error taxonomy.

use common::{OrderStatus, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the core services.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Bad input: missing or malformed fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Cart quantities must be at least 1.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// A status value outside the recognized set.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// The transition table rejected a status change.
    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Wrong role for the operation.
    #[error("Not authorized: {0}")]
    Unauthorized(&'static str),

    /// Missing entity, or one the caller may not see.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Checkout against an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Product is inactive or out of stock.
    #[error("Product {product_id} is not available")]
    ProductUnavailable { product_id: ProductId },

    /// Requested quantity exceeds current stock.
    #[error("Insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// Cancel requested from a non-cancellable status.
    #[error("Order cannot be cancelled from the {status} status")]
    NotCancellable { status: OrderStatus },

    /// Underlying persistence failure.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ShopError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InsufficientStock { product_id } => {
                ShopError::InsufficientStock { product_id }
            }
            other => ShopError::Storage(other),
        }
    }
}

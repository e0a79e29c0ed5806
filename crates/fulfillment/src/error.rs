//! Fulfillment error types.

use std::time::Duration;

use common::{ProductId, SupplierId};
use domain::DomainError;
use order_store::StoreError;
use thiserror::Error;

/// Errors that can fail a checkout.
///
/// Every variant is fatal to the checkout that raised it and guarantees that
/// no stock was decremented and no order was written.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The request contained no lines.
    #[error("Checkout has no items")]
    EmptyCheckout,

    /// A line asked for less than one unit.
    #[error("Invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Repeated lines for one product add up to more than a quantity can hold.
    #[error("Combined quantity for product {product_id} is too large")]
    QuantityOverflow { product_id: ProductId },

    /// A requested product does not exist.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// A line asks for more than the product has in stock.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The product changed owner between splitting and reserving.
    #[error("Product {product_id} belongs to supplier {actual}, expected {expected}")]
    SupplierMismatch {
        product_id: ProductId,
        expected: SupplierId,
        actual: SupplierId,
    },

    /// The store kept reporting conflicts after every retry.
    #[error("Checkout transaction conflicted after {attempts} attempts: {reason}")]
    TransactionConflict { attempts: u32, reason: String },

    /// An attempt did not finish in time and was rolled back.
    #[error("Checkout transaction did not complete within {0:?}")]
    CheckoutTimeout(Duration),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    /// Returns the product the failure is about, if any.
    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            FulfillmentError::InvalidQuantity { product_id, .. }
            | FulfillmentError::QuantityOverflow { product_id }
            | FulfillmentError::ProductNotFound { product_id }
            | FulfillmentError::InsufficientStock { product_id, .. }
            | FulfillmentError::SupplierMismatch { product_id, .. } => Some(*product_id),
            _ => None,
        }
    }

    /// Returns true if the whole checkout transaction may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FulfillmentError::Store(err) if err.is_conflict())
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;

//! Domain error types.

use common::ProductId;
use thiserror::Error;

/// Errors raised when constructing domain objects or reading them back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// An order must contain at least one item.
    #[error("Order has no items")]
    NoItems,

    /// Quantities are always at least one.
    #[error("Invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Stock can never be negative.
    #[error("Invalid stock for product {product_id}: {stock}")]
    InvalidStock { product_id: ProductId, stock: i64 },

    /// Price times quantity, or the sum of line totals, does not fit in cents.
    #[error("Amount overflow at product {product_id}")]
    AmountOverflow { product_id: ProductId },

    /// A stored quantity outside `1..=u32::MAX`.
    #[error("Invalid stored quantity for product {product_id}: {quantity}")]
    InvalidStoredQuantity { product_id: ProductId, quantity: i64 },

    /// A stored status name this version does not know.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}

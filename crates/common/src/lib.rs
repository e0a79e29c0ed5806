//! Shared identifier types for the order fulfillment engine.

mod types;

pub use types::{BuyerId, OrderId, ProductId, SupplierId};

//! Domain layer for the order fulfillment engine.
//!
//! This crate provides the data model shared by the store and the
//! fulfillment services:
//! - `Product` as seen by checkout (price, stock, owning supplier)
//! - `Order` and `OrderItem`, each order scoped to a single supplier
//! - `Money` for exact monetary arithmetic
//! - `OrderStatus` describing the order lifecycle

pub mod error;
pub mod order;
pub mod product;

pub use common::{BuyerId, OrderId, ProductId, SupplierId};
pub use error::DomainError;
pub use order::{Money, Order, OrderItem, OrderRequestItem, OrderStatus};
pub use product::{Product, ProductSummary};

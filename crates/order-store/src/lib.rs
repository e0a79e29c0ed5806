//! Transactional store for products and orders.
//!
//! The store is the only place stock is mutated. Writes happen through a
//! [`StoreTransaction`] obtained from [`OrderStore::begin`]; nothing a
//! transaction does is visible to anyone else until it commits, and a
//! transaction that is dropped without committing leaves no trace.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod state;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderStore, InMemoryTransaction};
pub use postgres::{PgStoreTransaction, PostgresOrderStore};
pub use state::TransactionState;
pub use store::{OrderStore, StoreTransaction};

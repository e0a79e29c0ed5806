use async_trait::async_trait;
use common::{BuyerId, OrderId, ProductId, SupplierId};
use domain::{Order, Product};

use crate::{Result, TransactionState};

/// Core trait for store implementations.
///
/// Reads on the store itself see committed data only. All implementations
/// must be thread-safe.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// The unit of work handed out by [`OrderStore::begin`].
    type Transaction: StoreTransaction;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Reads a product without locking it.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Reads several products without locking them. Unknown ids are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Inserts or replaces a product.
    ///
    /// This is the catalog's write path (seeding, restock, repricing); the
    /// checkout path never calls it.
    async fn upsert_product(&self, product: &Product) -> Result<()>;

    /// Loads an order with its items.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads every order placed by a buyer, newest first.
    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>>;

    /// Loads every order addressed to a supplier, newest first.
    async fn orders_for_supplier(&self, supplier_id: SupplierId) -> Result<Vec<Order>>;
}

/// An open unit of work against the store.
///
/// Dropping a transaction that has not been committed rolls it back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Returns where this transaction is in its lifecycle.
    fn state(&self) -> TransactionState;

    /// Re-reads a product inside the transaction and locks it against
    /// concurrent writers until the transaction finishes.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Overwrites the stock of a product previously locked by this transaction.
    async fn set_stock(&mut self, id: ProductId, stock: u32) -> Result<()>;

    /// Writes an order and all of its items.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Makes every write of this transaction visible at once.
    async fn commit(&mut self) -> Result<()>;

    /// Discards every write of this transaction.
    async fn rollback(&mut self) -> Result<()>;
}

/// Fails with `InvalidTransactionState` unless the transaction is open.
pub(crate) fn ensure_open(state: TransactionState) -> Result<()> {
    if state.is_open() {
        Ok(())
    } else {
        Err(crate::StoreError::InvalidTransactionState {
            expected: TransactionState::Open,
            actual: state,
        })
    }
}

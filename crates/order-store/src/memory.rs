use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use common::{BuyerId, OrderId, ProductId, SupplierId};
use domain::{Order, Product};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError, TransactionState,
    store::{OrderStore, StoreTransaction, ensure_open},
};

#[derive(Debug, Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    orders: Vec<Order>,
}

/// In-memory store implementation for testing and local development.
///
/// Transactions are serializable: an open transaction holds the store's
/// single lock until it commits or rolls back, and stages its writes in a
/// scratch area that is applied in one step on commit.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commits: Arc<AtomicU32>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given products.
    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().await;
            for product in products {
                state.products.insert(product.id, product);
            }
        }
        store
    }

    /// Makes the next `count` commits fail with `StoreError::Conflict`.
    pub fn fail_next_commits(&self, count: u32) {
        self.fail_next_commits.store(count, Ordering::SeqCst);
    }

    /// Returns the total number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    fn take_injected_failure(&self) -> bool {
        self.fail_next_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn orders_matching(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        let state = self.state.lock().await;
        let mut orders: Vec<_> = state
            .orders
            .iter()
            .filter(|o| predicate(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        Ok(InMemoryTransaction {
            store: self.clone(),
            guard: Some(guard),
            staged_stock: HashMap::new(),
            staged_orders: Vec::new(),
            state: TransactionState::Open,
        })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        self.state
            .lock()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Order>> {
        Ok(self.orders_matching(|o| o.buyer_id == buyer_id).await)
    }

    async fn orders_for_supplier(&self, supplier_id: SupplierId) -> Result<Vec<Order>> {
        Ok(self.orders_matching(|o| o.supplier_id == supplier_id).await)
    }
}

/// A transaction over [`InMemoryOrderStore`].
pub struct InMemoryTransaction {
    store: InMemoryOrderStore,
    guard: Option<OwnedMutexGuard<MemoryState>>,
    staged_stock: HashMap<ProductId, u32>,
    staged_orders: Vec<Order>,
    state: TransactionState,
}

impl InMemoryTransaction {
    fn guard(&self) -> Result<&MemoryState> {
        ensure_open(self.state)?;
        self.guard
            .as_deref()
            .ok_or(StoreError::InvalidTransactionState {
                expected: TransactionState::Open,
                actual: self.state,
            })
    }

    fn finish(&mut self, state: TransactionState) {
        self.staged_stock.clear();
        self.staged_orders.clear();
        self.guard = None;
        self.state = state;
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    fn state(&self) -> TransactionState {
        self.state
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let base = self.guard()?.products.get(&id).cloned();
        Ok(base.map(|mut product| {
            if let Some(stock) = self.staged_stock.get(&id) {
                product.stock = *stock;
            }
            product
        }))
    }

    async fn set_stock(&mut self, id: ProductId, stock: u32) -> Result<()> {
        self.guard()?;
        self.staged_stock.insert(id, stock);
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.guard()?;
        self.staged_orders.push(order.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        ensure_open(self.state)?;

        if self.store.take_injected_failure() {
            self.finish(TransactionState::Aborted);
            return Err(StoreError::Conflict(
                "injected commit failure".to_string(),
            ));
        }

        let staged_stock = std::mem::take(&mut self.staged_stock);
        let staged_orders = std::mem::take(&mut self.staged_orders);
        if let Some(state) = self.guard.as_deref_mut() {
            for (id, stock) in staged_stock {
                if let Some(product) = state.products.get_mut(&id) {
                    product.stock = stock;
                }
            }
            state.orders.extend(staged_orders);
        }

        self.finish(TransactionState::Committed);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        ensure_open(self.state)?;
        self.finish(TransactionState::Aborted);
        Ok(())
    }
}

//! Catalog collaborator.

use async_trait::async_trait;
use common::ProductId;
use domain::Product;
use order_store::OrderStore;

use crate::Result;

/// Read access to the product catalog.
///
/// Values returned here are advisory: stock may change the moment after it
/// is read. Checkout re-reads stock under lock before decrementing it.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Looks up a product. Returns `None` if the id is unknown.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;
}

/// Serves catalog lookups from the store's committed product rows.
#[derive(Debug, Clone)]
pub struct StoreCatalog<S> {
    store: S,
}

impl<S: OrderStore> StoreCatalog<S> {
    /// Creates a catalog over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: OrderStore> Catalog for StoreCatalog<S> {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.store.get_product(id).await?)
    }
}

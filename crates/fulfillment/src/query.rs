//! Read-side views over committed orders.

use std::collections::HashMap;

use common::{BuyerId, OrderId, ProductId, SupplierId};
use domain::{Order, OrderItem, ProductSummary};
use order_store::OrderStore;
use serde::Serialize;

use crate::error::Result;

/// One order line with the product it refers to, if that product still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub item: OrderItem,
    pub product: Option<ProductSummary>,
}

/// An order joined with product details for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub lines: Vec<OrderLineView>,
}

/// Lists and fetches orders for buyers and suppliers.
///
/// Reads only committed data and takes no row locks.
#[derive(Clone)]
pub struct OrderQueryService<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> OrderQueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Every order placed by `buyer_id`, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<OrderView>> {
        let orders = self.store.orders_for_buyer(buyer_id).await?;
        self.with_products(orders).await
    }

    /// Every order addressed to `supplier_id`, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_supplier(&self, supplier_id: SupplierId) -> Result<Vec<OrderView>> {
        let orders = self.store.orders_for_supplier(supplier_id).await?;
        self.with_products(orders).await
    }

    /// A single order, if it exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, order_id: OrderId) -> Result<Option<OrderView>> {
        match self.store.get_order(order_id).await? {
            Some(order) => Ok(self.with_products(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn with_products(&self, orders: Vec<Order>) -> Result<Vec<OrderView>> {
        let mut ids: Vec<ProductId> = orders
            .iter()
            .flat_map(|order| order.items.iter().map(|item| item.product_id))
            .collect();
        ids.sort();
        ids.dedup();

        let products: HashMap<ProductId, ProductSummary> = self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product.summary()))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let lines = order
                    .items
                    .iter()
                    .map(|item| OrderLineView {
                        item: item.clone(),
                        product: products.get(&item.product_id).cloned(),
                    })
                    .collect();
                OrderView { order, lines }
            })
            .collect())
    }
}

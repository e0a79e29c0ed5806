//! Partitioning a checkout into per-supplier groups.

use common::{BuyerId, ProductId, SupplierId};
use domain::{OrderRequestItem, Product};

use crate::error::{FulfillmentError, Result};
use crate::services::Catalog;

/// A requested line together with the product it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// The catalog's view of the product at split time. Advisory only.
    pub product: Product,
}

/// Every line of a checkout that belongs to one supplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierGroup {
    pub supplier_id: SupplierId,
    pub items: Vec<GroupedItem>,
}

impl SupplierGroup {
    /// Returns the number of units requested from this supplier.
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

/// Resolves requested lines through the catalog and groups them by supplier.
///
/// The splitter has no side effects. Its stock check rejects hopeless
/// requests early but guarantees nothing: stock is only authoritative inside
/// the checkout transaction.
pub struct OrderSplitter<C: Catalog> {
    catalog: C,
}

impl<C: Catalog> OrderSplitter<C> {
    /// Creates a splitter reading from `catalog`.
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Splits `items` into supplier groups.
    ///
    /// Groups appear in the order their supplier is first mentioned, and
    /// lines keep their request order inside a group. Repeated lines for
    /// the same product are merged into the first one.
    #[tracing::instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn split(
        &self,
        buyer_id: BuyerId,
        items: &[OrderRequestItem],
    ) -> Result<Vec<SupplierGroup>> {
        if items.is_empty() {
            return Err(FulfillmentError::EmptyCheckout);
        }

        let lines = merge_lines(items)?;

        let mut resolved = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = self
                .catalog
                .get_product(line.product_id)
                .await?
                .ok_or(FulfillmentError::ProductNotFound {
                    product_id: line.product_id,
                })?;
            resolved.push(GroupedItem {
                product_id: line.product_id,
                quantity: line.quantity,
                product,
            });
        }

        if let Some(short) = resolved
            .iter()
            .find(|item| !item.product.has_stock_for(item.quantity))
        {
            return Err(FulfillmentError::InsufficientStock {
                product_id: short.product_id,
                requested: short.quantity,
                available: short.product.stock,
            });
        }

        let groups = group_by_supplier(resolved);
        tracing::debug!(groups = groups.len(), "checkout split by supplier");
        Ok(groups)
    }
}

/// Validates quantities and folds repeated products into their first line.
fn merge_lines(items: &[OrderRequestItem]) -> Result<Vec<OrderRequestItem>> {
    let mut lines: Vec<OrderRequestItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            return Err(FulfillmentError::InvalidQuantity {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }
        match lines.iter_mut().find(|l| l.product_id == item.product_id) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(item.quantity).ok_or(
                    FulfillmentError::QuantityOverflow {
                        product_id: item.product_id,
                    },
                )?;
            }
            None => lines.push(*item),
        }
    }
    Ok(lines)
}

fn group_by_supplier(items: Vec<GroupedItem>) -> Vec<SupplierGroup> {
    let mut groups: Vec<SupplierGroup> = Vec::new();
    for item in items {
        let supplier_id = item.product.supplier_id;
        match groups.iter_mut().find(|g| g.supplier_id == supplier_id) {
            Some(group) => group.items.push(item),
            None => groups.push(SupplierGroup {
                supplier_id,
                items: vec![item],
            }),
        }
    }
    groups
}

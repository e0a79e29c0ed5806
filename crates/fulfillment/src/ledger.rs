//! Inventory ledger: the only code path that decrements stock.

use common::ProductId;
use domain::Product;
use order_store::StoreTransaction;

use crate::error::{FulfillmentError, Result};

/// Stock taken for one line inside a checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// The product as re-read under lock, before the decrement.
    pub product: Product,
    pub quantity: u32,
    pub remaining_stock: u32,
}

/// Owns the `stock >= 0` invariant.
///
/// A reservation re-reads the product inside the caller's transaction, with
/// the row locked, and decrements it in that same transaction. Nothing read
/// before the transaction started is trusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger;

impl InventoryLedger {
    pub fn new() -> Self {
        Self
    }

    /// Checks and decrements stock for `product_id` within `tx`.
    #[tracing::instrument(skip(self, tx))]
    pub async fn reserve<T>(
        &self,
        tx: &mut T,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Reservation>
    where
        T: StoreTransaction + ?Sized,
    {
        let product = tx
            .lock_product(product_id)
            .await?
            .ok_or(FulfillmentError::ProductNotFound { product_id })?;

        let remaining_stock =
            product
                .stock
                .checked_sub(quantity)
                .ok_or(FulfillmentError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available: product.stock,
                })?;

        tx.set_stock(product_id, remaining_stock).await?;
        metrics::counter!("inventory_reservations_total").increment(1);

        Ok(Reservation {
            product,
            quantity,
            remaining_stock,
        })
    }
}

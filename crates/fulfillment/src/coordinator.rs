//! Transactional checkout coordinator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use common::{BuyerId, ProductId};
use domain::{Order, OrderItem, Product};
use order_store::{OrderStore, StoreError, StoreTransaction};

use crate::config::FulfillmentConfig;
use crate::error::{FulfillmentError, Result};
use crate::ledger::{InventoryLedger, Reservation};
use crate::splitter::SupplierGroup;

/// Creates every sub-order of a checkout in one store transaction.
///
/// Either all reservations and all orders are committed, or none are. A
/// conflicting attempt is rolled back and the whole checkout is retried with
/// exponential backoff, up to `max_retries` times.
pub struct FulfillmentCoordinator<S: OrderStore> {
    store: S,
    ledger: InventoryLedger,
    config: FulfillmentConfig,
}

impl<S: OrderStore> FulfillmentCoordinator<S> {
    /// Creates a coordinator with default tuning.
    pub fn new(store: S) -> Self {
        Self::with_config(store, FulfillmentConfig::default())
    }

    pub fn with_config(store: S, config: FulfillmentConfig) -> Self {
        Self {
            store,
            ledger: InventoryLedger::new(),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FulfillmentConfig {
        &self.config
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.config.retry_min_delay)
            .with_max_delay(self.config.retry_max_delay)
            .with_max_times(self.config.max_retries)
            .with_jitter()
    }

    /// Reserves stock and writes one order per group, atomically.
    ///
    /// Returned orders follow ascending supplier id.
    #[tracing::instrument(skip(self, groups), fields(groups = groups.len()))]
    pub async fn checkout(
        &self,
        buyer_id: BuyerId,
        mut groups: Vec<SupplierGroup>,
    ) -> Result<Vec<Order>> {
        if groups.is_empty() {
            return Err(FulfillmentError::EmptyCheckout);
        }
        groups.sort_by_key(|group| group.supplier_id);

        let attempts = AtomicU32::new(0);
        let timeout = self.config.transaction_timeout;
        let (attempts_ref, groups_ref) = (&attempts, &groups);

        let result = (|| async move {
            attempts_ref.fetch_add(1, Ordering::SeqCst);
            tokio::time::timeout(timeout, self.attempt(buyer_id, groups_ref))
                .await
                .map_err(|_| FulfillmentError::CheckoutTimeout(timeout))?
        })
        .retry(self.backoff())
        .when(FulfillmentError::is_retryable)
        .notify(|err: &FulfillmentError, dur: Duration| {
            metrics::counter!("checkout_retries_total").increment(1);
            tracing::warn!(error = %err, delay = ?dur, "checkout transaction conflicted, retrying");
        })
        .await;

        match result {
            Ok(orders) => {
                tracing::info!(
                    orders = orders.len(),
                    attempts = attempts.load(Ordering::SeqCst),
                    "checkout committed"
                );
                Ok(orders)
            }
            Err(FulfillmentError::Store(StoreError::Conflict(reason))) => {
                Err(FulfillmentError::TransactionConflict {
                    attempts: attempts.load(Ordering::SeqCst),
                    reason,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// One try: begin, reserve and record, commit. Any failure rolls back.
    async fn attempt(&self, buyer_id: BuyerId, groups: &[SupplierGroup]) -> Result<Vec<Order>> {
        let mut tx = self.store.begin().await?;

        match self.reserve_and_record(&mut tx, buyer_id, groups).await {
            Ok(orders) => {
                tx.commit().await?;
                Ok(orders)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        "failed to roll back checkout transaction"
                    );
                }
                Err(err)
            }
        }
    }

    async fn reserve_and_record(
        &self,
        tx: &mut S::Transaction,
        buyer_id: BuyerId,
        groups: &[SupplierGroup],
    ) -> Result<Vec<Order>> {
        // Rows are locked in ascending product id so that concurrent
        // checkouts over the same products queue instead of deadlocking.
        let mut lines: Vec<_> = groups
            .iter()
            .flat_map(|group| group.items.iter().map(move |item| (group.supplier_id, item)))
            .collect();
        lines.sort_by_key(|(_, item)| item.product_id);

        // A product may appear on several lines. Each line reserves its own
        // quantity; later lines see the stock left by earlier ones.
        let mut locked: HashMap<ProductId, Product> = HashMap::with_capacity(lines.len());
        for (supplier_id, item) in lines {
            let Reservation { product, .. } = self
                .ledger
                .reserve(&mut *tx, item.product_id, item.quantity)
                .await?;
            if product.supplier_id != supplier_id {
                return Err(FulfillmentError::SupplierMismatch {
                    product_id: item.product_id,
                    expected: supplier_id,
                    actual: product.supplier_id,
                });
            }
            locked.insert(item.product_id, product);
        }

        let created_at = Utc::now();
        let mut orders = Vec::with_capacity(groups.len());
        for group in groups {
            let items = group
                .items
                .iter()
                .map(|item| {
                    let product = locked.get(&item.product_id).ok_or(
                        FulfillmentError::ProductNotFound {
                            product_id: item.product_id,
                        },
                    )?;
                    Ok(OrderItem::new(item.product_id, item.quantity, product.price))
                })
                .collect::<Result<Vec<_>>>()?;
            let order = Order::new(buyer_id, group.supplier_id, items, created_at)?;
            tx.insert_order(&order).await?;
            orders.push(order);
        }

        Ok(orders)
    }
}

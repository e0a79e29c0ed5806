//! The checkout entry point.

use std::time::Instant;

use common::BuyerId;
use domain::{Order, OrderRequestItem};
use order_store::OrderStore;

use crate::coordinator::FulfillmentCoordinator;
use crate::dispatcher::NotificationDispatcher;
use crate::error::Result;
use crate::services::Catalog;
use crate::splitter::OrderSplitter;

/// Runs a buyer checkout end to end: split, commit, then notify.
///
/// Notifications are queued only after the transaction committed, and their
/// outcome never changes the checkout result.
pub struct CheckoutService<S: OrderStore, C: Catalog> {
    splitter: OrderSplitter<C>,
    coordinator: FulfillmentCoordinator<S>,
    dispatcher: NotificationDispatcher,
}

impl<S: OrderStore, C: Catalog> CheckoutService<S, C> {
    pub fn new(
        splitter: OrderSplitter<C>,
        coordinator: FulfillmentCoordinator<S>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            splitter,
            coordinator,
            dispatcher,
        }
    }

    /// Places one `Pending` order per supplier represented in `items`.
    #[tracing::instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn checkout(
        &self,
        buyer_id: BuyerId,
        items: &[OrderRequestItem],
    ) -> Result<Vec<Order>> {
        metrics::counter!("checkout_requests_total").increment(1);
        let started = Instant::now();

        let result = self.place_orders(buyer_id, items).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(orders) => {
                metrics::counter!("checkout_completed").increment(1);
                self.dispatcher.notify(orders);
            }
            Err(e) => {
                metrics::counter!("checkout_failed").increment(1);
                tracing::info!(error = %e, "checkout rejected");
            }
        }
        result
    }

    async fn place_orders(
        &self,
        buyer_id: BuyerId,
        items: &[OrderRequestItem],
    ) -> Result<Vec<Order>> {
        let groups = self.splitter.split(buyer_id, items).await?;
        self.coordinator.checkout(buyer_id, groups).await
    }
}

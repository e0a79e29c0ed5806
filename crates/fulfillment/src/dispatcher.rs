//! Post-commit notification dispatch.
//!
//! Committed orders are handed to a detached worker through an unbounded
//! channel, so the checkout never waits on the sink. Each delivery runs as
//! its own task: a slow or failing delivery delays nobody else.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::Order;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::services::{NotificationSink, OrderNotification};

/// A delivery the sink did not accept.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    pub notification: OrderNotification,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Handle used by the checkout path to queue notifications.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<OrderNotification>,
}

/// The background task delivering queued notifications.
///
/// It stops once every [`NotificationDispatcher`] clone is dropped and all
/// queued deliveries have finished.
pub struct NotificationWorker {
    handle: JoinHandle<()>,
}

impl NotificationDispatcher {
    /// Starts a worker delivering to `sink`.
    pub fn spawn(sink: Arc<dyn NotificationSink>) -> (Self, NotificationWorker) {
        Self::start(sink, None)
    }

    /// Starts a worker that also reports every failed delivery on
    /// `dead_letters`.
    pub fn spawn_with_dead_letters(
        sink: Arc<dyn NotificationSink>,
        dead_letters: mpsc::UnboundedSender<DeliveryFailure>,
    ) -> (Self, NotificationWorker) {
        Self::start(sink, Some(dead_letters))
    }

    fn start(
        sink: Arc<dyn NotificationSink>,
        dead_letters: Option<mpsc::UnboundedSender<DeliveryFailure>>,
    ) -> (Self, NotificationWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(rx, sink, dead_letters));
        (Self { tx }, NotificationWorker { handle })
    }

    /// Queues one notification per order. Never blocks.
    pub fn notify(&self, orders: &[Order]) {
        for order in orders {
            if self.tx.send(OrderNotification::from(order)).is_err() {
                tracing::warn!(
                    order_id = %order.id,
                    supplier_id = %order.supplier_id,
                    "notification worker has stopped, dropping notification"
                );
            }
        }
    }
}

impl NotificationWorker {
    /// Waits for the worker to drain and exit.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "notification worker terminated abnormally");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<OrderNotification>,
    sink: Arc<dyn NotificationSink>,
    dead_letters: Option<mpsc::UnboundedSender<DeliveryFailure>>,
) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(notification) => {
                    in_flight.spawn(deliver(sink.clone(), notification, dead_letters.clone()));
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_join_error(joined);
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        log_join_error(joined);
    }
    tracing::debug!("notification worker drained");
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "notification delivery task panicked");
    }
}

async fn deliver(
    sink: Arc<dyn NotificationSink>,
    notification: OrderNotification,
    dead_letters: Option<mpsc::UnboundedSender<DeliveryFailure>>,
) {
    match sink.deliver(&notification).await {
        Ok(()) => {
            metrics::counter!("notifications_delivered_total").increment(1);
            tracing::debug!(order_id = %notification.order_id, "notification delivered");
        }
        Err(e) => {
            metrics::counter!("notifications_failed_total").increment(1);
            tracing::warn!(
                event = "NotificationDeliveryFailure",
                order_id = %notification.order_id,
                supplier_id = %notification.supplier_id,
                error = %e,
                "failed to deliver order notification"
            );
            if let Some(dead_letters) = dead_letters {
                // The receiver may be gone; the failure is already logged.
                let _ = dead_letters.send(DeliveryFailure {
                    notification,
                    error: e.to_string(),
                    failed_at: Utc::now(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use common::{BuyerId, ProductId, SupplierId};
    use domain::{Money, OrderItem};

    use super::*;
    use crate::services::InMemoryNotificationSink;

    fn order(supplier_id: SupplierId) -> Order {
        Order::new(
            BuyerId::new(),
            supplier_id,
            vec![OrderItem::new(ProductId::new(), 1, Money::from_cents(500))],
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_delivers_every_order() {
        let sink = InMemoryNotificationSink::new();
        let (dispatcher, worker) = NotificationDispatcher::spawn(Arc::new(sink.clone()));
        let orders = vec![order(SupplierId::new()), order(SupplierId::new())];

        dispatcher.notify(&orders);
        drop(dispatcher);
        worker.join().await;

        let delivered = sink.delivered().await;
        assert_eq!(delivered.len(), 2);
        for order in &orders {
            assert!(delivered.iter().any(|n| n.order_id == order.id));
        }
    }

    #[tokio::test]
    async fn test_failed_delivery_is_reported_and_isolated() {
        let failing = SupplierId::new();
        let sink = InMemoryNotificationSink::new();
        sink.fail_for_supplier(failing).await;
        let (dead_tx, mut dead_rx) = mpsc::unbounded_channel();
        let (dispatcher, worker) =
            NotificationDispatcher::spawn_with_dead_letters(Arc::new(sink.clone()), dead_tx);
        let bad = order(failing);
        let good = order(SupplierId::new());

        dispatcher.notify(&[bad.clone(), good.clone()]);
        drop(dispatcher);
        worker.join().await;

        let delivered = sink.delivered().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].order_id, good.id);

        let failure = dead_rx.recv().await.unwrap();
        assert_eq!(failure.notification.order_id, bad.id);
        assert!(failure.error.contains("unavailable"));
        assert!(dead_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_notify_does_not_wait_for_slow_sink() {
        let sink = InMemoryNotificationSink::new();
        sink.set_delay(Duration::from_millis(300)).await;
        let (dispatcher, worker) = NotificationDispatcher::spawn(Arc::new(sink.clone()));

        let started = Instant::now();
        dispatcher.notify(&[order(SupplierId::new())]);
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(sink.delivery_count().await, 0);

        drop(dispatcher);
        worker.join().await;
        assert_eq!(sink.delivery_count().await, 1);
    }

    #[tokio::test]
    async fn test_notify_after_worker_exit_is_harmless() {
        let sink = InMemoryNotificationSink::new();
        let (dispatcher, worker) = NotificationDispatcher::spawn(Arc::new(sink.clone()));
        worker.handle.abort();
        let _ = worker.handle.await;

        dispatcher.notify(&[order(SupplierId::new())]);
        assert_eq!(sink.delivery_count().await, 0);
    }
}

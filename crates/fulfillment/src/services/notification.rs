//! Notification sink trait and implementations.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BuyerId, OrderId, ProductId, SupplierId};
use domain::{Order, OrderStatus};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors a sink can report for a single delivery.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The sink is not usable as configured.
    #[error("Notification sink misconfigured: {0}")]
    Config(String),

    /// The request never got a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The sink refused the delivery.
    #[error("Notification sink unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One line of a notified order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

/// The payload sent to the notification sink for each committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNotification {
    pub order_id: OrderId,
    pub buyer_id: BuyerId,
    pub supplier_id: SupplierId,
    pub status: OrderStatus,
    pub items: Vec<NotificationItem>,
    pub total_amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderNotification {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            buyer_id: order.buyer_id,
            supplier_id: order.supplier_id,
            status: order.status,
            items: order
                .items
                .iter()
                .map(|item| NotificationItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            total_amount_cents: order.total_amount.cents(),
            created_at: order.created_at,
        }
    }
}

/// Trait for the external system told about new orders.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one order notification.
    async fn deliver(&self, notification: &OrderNotification) -> Result<(), NotificationError>;
}

/// Webhook sink configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Endpoint URL receiving a POST per order.
    pub endpoint: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl WebhookConfig {
    /// Creates a config for `endpoint` with a 10 second timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// POSTs each order as JSON to a webhook endpoint.
///
/// A single attempt per order: anything but a 2xx answer is a failure.
pub struct WebhookSink {
    client: Client,
    config: WebhookConfig,
}

impl WebhookSink {
    /// Create a new webhook sink with the given configuration.
    pub fn new(config: WebhookConfig) -> Result<Self, NotificationError> {
        if config.endpoint.is_empty() {
            return Err(NotificationError::Config(
                "webhook endpoint not configured".to_string(),
            ));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, notification: &OrderNotification) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(notification)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(
                endpoint = %self.config.endpoint,
                order_id = %notification.order_id,
                "order notification posted"
            );
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotificationError::Rejected {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn deliver(&self, notification: &OrderNotification) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(notification)?;
        tracing::info!(
            order_id = %notification.order_id,
            supplier_id = %notification.supplier_id,
            %payload,
            "order notification"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemorySinkState {
    delivered: Vec<OrderNotification>,
    fail_all: bool,
    failing_suppliers: HashSet<SupplierId>,
    delay: Option<Duration>,
}

/// In-memory notification sink for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSink {
    state: Arc<Mutex<InMemorySinkState>>,
}

impl InMemoryNotificationSink {
    /// Creates a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sink to fail every delivery.
    pub async fn set_fail_on_deliver(&self, fail: bool) {
        self.state.lock().await.fail_all = fail;
    }

    /// Configures the sink to fail deliveries for one supplier only.
    pub async fn fail_for_supplier(&self, supplier_id: SupplierId) {
        self.state.lock().await.failing_suppliers.insert(supplier_id);
    }

    /// Makes every delivery take at least `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        self.state.lock().await.delay = Some(delay);
    }

    /// Returns every notification delivered so far.
    pub async fn delivered(&self) -> Vec<OrderNotification> {
        self.state.lock().await.delivered.clone()
    }

    /// Returns the number of successful deliveries.
    pub async fn delivery_count(&self) -> usize {
        self.state.lock().await.delivered.len()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn deliver(&self, notification: &OrderNotification) -> Result<(), NotificationError> {
        let delay = self.state.lock().await.delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if state.fail_all || state.failing_suppliers.contains(&notification.supplier_id) {
            return Err(NotificationError::Unavailable(
                "sink refused delivery".to_string(),
            ));
        }
        state.delivered.push(notification.clone());
        Ok(())
    }
}

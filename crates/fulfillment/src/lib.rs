//! Order fulfillment engine.
//!
//! Turns one buyer checkout into one `Pending` order per supplier:
//! 1. Split: resolve every requested product and group the lines by supplier
//! 2. Coordinate: in a single store transaction, reserve stock for every line
//!    and write every sub-order (all or nothing)
//! 3. Notify: after commit, hand each order to a detached worker that
//!    delivers it to the notification sink
//!
//! Orders are read back through the query service.

pub mod checkout;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod query;
pub mod services;
pub mod splitter;

pub use checkout::CheckoutService;
pub use config::FulfillmentConfig;
pub use coordinator::FulfillmentCoordinator;
pub use dispatcher::{DeliveryFailure, NotificationDispatcher, NotificationWorker};
pub use error::{FulfillmentError, Result};
pub use ledger::{InventoryLedger, Reservation};
pub use query::{OrderLineView, OrderQueryService, OrderView};
pub use services::{
    Catalog, InMemoryNotificationSink, LoggingSink, NotificationError, NotificationSink,
    OrderNotification, StoreCatalog, WebhookConfig, WebhookSink,
};
pub use splitter::{GroupedItem, OrderSplitter, SupplierGroup};

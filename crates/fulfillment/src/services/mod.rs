//! Collaborator traits and their implementations.

pub mod catalog;
pub mod notification;

pub use catalog::{Catalog, StoreCatalog};
pub use notification::{
    InMemoryNotificationSink, LoggingSink, NotificationError, NotificationSink,
    OrderNotification, WebhookConfig, WebhookSink,
};

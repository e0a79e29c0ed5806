//! HTTP API server with observability for the order fulfillment engine.
//!
//! Exposes checkout and order queries over REST, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fulfillment::{
    CheckoutService, FulfillmentConfig, FulfillmentCoordinator, NotificationDispatcher,
    OrderQueryService, OrderSplitter, StoreCatalog,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore + Clone> {
    pub checkout: CheckoutService<S, StoreCatalog<S>>,
    pub queries: OrderQueryService<S>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout", post(routes::checkout::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/buyers/{id}/orders", get(routes::orders::list_for_buyer::<S>))
        .route(
            "/suppliers/{id}/orders",
            get(routes::orders::list_for_supplier::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the fulfillment services over `store`.
///
/// Checkout reads the catalog through the same store it reserves stock in.
pub fn create_state<S: OrderStore + Clone + 'static>(
    store: S,
    config: FulfillmentConfig,
    dispatcher: NotificationDispatcher,
) -> Arc<AppState<S>> {
    let checkout = CheckoutService::new(
        OrderSplitter::new(StoreCatalog::new(store.clone())),
        FulfillmentCoordinator::with_config(store.clone(), config),
        dispatcher,
    );

    Arc::new(AppState {
        checkout,
        queries: OrderQueryService::new(store),
    })
}

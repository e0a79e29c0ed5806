//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use fulfillment::{
    LoggingSink, NotificationDispatcher, NotificationSink, WebhookConfig, WebhookSink,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn notification_sink(config: &Config) -> Arc<dyn NotificationSink> {
    match &config.notification_webhook_url {
        Some(url) => {
            let webhook =
                WebhookConfig::new(url.as_str()).with_timeout(config.notification_timeout);
            let sink =
                WebhookSink::new(webhook).expect("invalid notification webhook configuration");
            tracing::info!(
                endpoint = %sink.endpoint(),
                "delivering order notifications by webhook"
            );
            Arc::new(sink)
        }
        None => {
            tracing::info!("no webhook configured, order notifications will only be logged");
            Arc::new(LoggingSink)
        }
    }
}

/// Serves the API over `store` until a shutdown signal arrives.
///
/// Returns once in-flight requests have finished and the application state
/// (and with it the notification dispatcher) has been dropped.
async fn serve<S: OrderStore + Clone + 'static>(
    store: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
    dispatcher: NotificationDispatcher,
) {
    let state = api::create_state(store, config.fulfillment(), dispatcher);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Start the notification worker
    let (dispatcher, worker) = NotificationDispatcher::spawn(notification_sink(&config));

    // 4. Pick the store and serve
    match &config.database_url {
        Some(url) => {
            let store = PostgresOrderStore::connect(url, config.database_max_connections)
                .await
                .expect("failed to connect to database");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL order store");
            serve(store, &config, metrics_handle, dispatcher).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory order store");
            serve(InMemoryOrderStore::new(), &config, metrics_handle, dispatcher).await;
        }
    }

    // 5. Let queued notifications finish
    tracing::info!("server stopped, draining notifications");
    worker.join().await;
    tracing::info!("shut down gracefully");
}

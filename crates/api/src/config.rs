//! Application configuration loaded from environment variables.

use std::time::Duration;

use fulfillment::FulfillmentConfig;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for JSON lines, anything else for human output
/// - `DATABASE_URL`: PostgreSQL URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `NOTIFICATION_WEBHOOK_URL`: order notification endpoint; notifications
///   are only logged when unset
/// - `NOTIFICATION_TIMEOUT_SECS`: webhook request timeout (default: `10`)
/// - `CHECKOUT_MAX_RETRIES`: conflict retries per checkout (default: `3`)
/// - `CHECKOUT_TIMEOUT_MS`: per-attempt transaction timeout (default: `5000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub notification_webhook_url: Option<String>,
    pub notification_timeout: Duration,
    pub checkout_max_retries: usize,
    pub checkout_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(lookup("PORT"), defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT") {
                Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse_or(
                lookup("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            ),
            notification_webhook_url: non_empty("NOTIFICATION_WEBHOOK_URL"),
            notification_timeout: lookup("NOTIFICATION_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.notification_timeout),
            checkout_max_retries: parse_or(
                lookup("CHECKOUT_MAX_RETRIES"),
                defaults.checkout_max_retries,
            ),
            checkout_timeout: lookup("CHECKOUT_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.checkout_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the checkout transaction tuning described by this config.
    pub fn fulfillment(&self) -> FulfillmentConfig {
        FulfillmentConfig::default()
            .with_max_retries(self.checkout_max_retries)
            .with_transaction_timeout(self.checkout_timeout)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        let fulfillment = FulfillmentConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            database_max_connections: 10,
            notification_webhook_url: None,
            notification_timeout: Duration::from_secs(10),
            checkout_max_retries: fulfillment.max_retries,
            checkout_timeout: fulfillment.transaction_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.database_url.is_none());
        assert!(config.notification_webhook_url.is_none());
        assert_eq!(config.checkout_max_retries, 3);
        assert_eq!(config.checkout_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.notification_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_reads_every_variable() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("RUST_LOG", "debug"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("NOTIFICATION_WEBHOOK_URL", "http://hooks.local/orders"),
            ("NOTIFICATION_TIMEOUT_SECS", "3"),
            ("CHECKOUT_MAX_RETRIES", "5"),
            ("CHECKOUT_TIMEOUT_MS", "750"),
        ]);

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );
        assert_eq!(config.database_max_connections, 25);
        assert_eq!(
            config.notification_webhook_url.as_deref(),
            Some("http://hooks.local/orders")
        );
        assert_eq!(config.notification_timeout, Duration::from_secs(3));

        let fulfillment = config.fulfillment();
        assert_eq!(fulfillment.max_retries, 5);
        assert_eq!(fulfillment.transaction_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_invalid_and_blank_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "not-a-port"),
            ("CHECKOUT_MAX_RETRIES", "-1"),
            ("DATABASE_URL", "  "),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.checkout_max_retries, 3);
        assert!(config.database_url.is_none());
    }
}

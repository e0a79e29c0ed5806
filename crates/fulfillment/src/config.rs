//! Checkout transaction tuning.

use std::time::Duration;

/// Bounds on how long and how often a checkout transaction is attempted.
#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    /// Retries after the first attempt when the store reports a conflict.
    pub max_retries: usize,
    /// Upper bound for a single attempt, lock waits included.
    pub transaction_timeout: Duration,
    pub retry_min_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            transaction_timeout: Duration::from_secs(5),
            retry_min_delay: Duration::from_millis(10),
            retry_max_delay: Duration::from_millis(200),
        }
    }
}

impl FulfillmentConfig {
    /// Sets the number of conflict retries.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }
}

use domain::DomainError;
use thiserror::Error;

use crate::TransactionState;

/// SQLSTATE: could not serialize access due to concurrent update.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE: deadlock detected.
const DEADLOCK_DETECTED: &str = "40P01";
/// SQLSTATE: lock not available (lock_timeout expired).
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The transaction lost a race with a concurrent one and was rolled back.
    /// Retrying the whole unit of work may succeed.
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// An operation was attempted on a transaction that is no longer open.
    #[error("Transaction is {actual}, expected {expected}")]
    InvalidTransactionState {
        expected: TransactionState,
        actual: TransactionState,
    },

    /// A persisted row does not form a valid domain object.
    #[error("Corrupt record: {0}")]
    Corrupt(#[from] DomainError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if the failed unit of work may succeed when retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && let Some(code) = db_err.code()
            && matches!(
                &*code,
                SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE
            )
        {
            return StoreError::Conflict(db_err.message().to_string());
        }
        StoreError::Database(err)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

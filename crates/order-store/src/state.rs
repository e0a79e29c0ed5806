//! Transaction state machine.

use serde::{Deserialize, Serialize};

/// The state of a store transaction.
///
/// State transitions:
/// ```text
/// Open ──┬──► Committed
///        └──► Aborted
/// ```
/// There is no partially committed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionState {
    /// Reads and writes are allowed.
    #[default]
    Open,

    /// All writes became visible at once (terminal state).
    Committed,

    /// All writes were discarded (terminal state).
    Aborted,
}

impl TransactionState {
    /// Returns true if the transaction still accepts work.
    pub fn is_open(&self) -> bool {
        matches!(self, TransactionState::Open)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Open => "Open",
            TransactionState::Committed => "Committed",
            TransactionState::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_open() {
        assert_eq!(TransactionState::default(), TransactionState::Open);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TransactionState::Open.is_terminal());
        assert!(TransactionState::Committed.is_terminal());
        assert!(TransactionState::Aborted.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(TransactionState::Open.to_string(), "Open");
        assert_eq!(TransactionState::Committed.to_string(), "Committed");
        assert_eq!(TransactionState::Aborted.to_string(), "Aborted");
    }
}

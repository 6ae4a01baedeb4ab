use thiserror::Error;

use crate::domain::Shards;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Precondition violated: {operation} called with amount {amount}")]
    PreconditionViolation {
        operation: &'static str,
        amount: Shards,
    },

    #[error("Balance overflow for {key}: {balance} + {amount} is not representable")]
    Overflow {
        key: String,
        balance: Shards,
        amount: Shards,
    },

    #[error("Ledger store is corrupt: {0}")]
    CorruptStore(#[source] StoreError),

    #[error("Failed to persist ledger: {0}")]
    Persistence(#[source] StoreError),
}

impl LedgerError {
    /// Classify a failure while loading: unparseable data is corruption,
    /// anything else is an I/O problem.
    pub fn from_load(error: StoreError) -> Self {
        if error.is_corrupt() {
            LedgerError::CorruptStore(error)
        } else {
            LedgerError::Persistence(error)
        }
    }
}

mod json_file;
mod sqlite;

use std::future::Future;

use thiserror::Error;

use crate::domain::Balances;

pub use json_file::*;
pub use sqlite::*;

/// SQL migration for the accounts table
pub const MIGRATION_001_ACCOUNTS: &str = include_str!("migrations/001_accounts.sql");

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Corrupt ledger store at {location}: {reason}")]
    Corrupt { location: String, reason: String },

    #[error("I/O error on ledger store at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error on ledger store at {location}: {source}")]
    Database {
        location: String,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}

/// Durable load/save of the whole account map as a single unit.
/// Implementations are the only code that touches the backing store.
pub trait LedgerStore: Send + Sync {
    /// Read the full map. A store that does not exist yet yields an empty map.
    fn load(&self) -> impl Future<Output = Result<Balances, StoreError>> + Send;

    /// Replace the stored map with `balances`. Either the old or the new
    /// contents survive a crash, never a mix.
    fn save(&self, balances: &Balances) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Where the data lives, for errors and logs.
    fn location(&self) -> String;
}

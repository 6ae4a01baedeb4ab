// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use shardledger::domain::{Balances, Shards};
use shardledger::storage::{JsonFileStore, LedgerStore, StoreError};
use shardledger::Ledger;
use tempfile::TempDir;

/// Helper to create a ledger over a JSON document in a temporary directory
pub async fn test_ledger(default_balance: Shards) -> Result<(Ledger<JsonFileStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let ledger = Ledger::open(json_store(&temp_dir), default_balance).await?;
    Ok((ledger, temp_dir))
}

/// JSON store at the standard location inside `dir`
pub fn json_store(dir: &TempDir) -> JsonFileStore {
    JsonFileStore::new(data_path(dir))
}

pub fn data_path(dir: &TempDir) -> PathBuf {
    dir.path().join("shards.json")
}

/// Simulate a process restart: open a fresh ledger over the same file
pub async fn reopen(dir: &TempDir, default_balance: Shards) -> Result<Ledger<JsonFileStore>> {
    Ok(Ledger::open(json_store(dir), default_balance).await?)
}

/// Store double that counts saves and can be told to fail them
#[derive(Clone)]
pub struct FlakyStore {
    inner: JsonFileStore,
    failing: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new(inner: JsonFileStore) -> Self {
        Self {
            inner,
            failing: Arc::new(AtomicBool::new(false)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl LedgerStore for FlakyStore {
    async fn load(&self) -> Result<Balances, StoreError> {
        self.inner.load().await
    }

    async fn save(&self, balances: &Balances) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                location: self.location(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.save(balances).await?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

/// Helper to open a ledger over a [`FlakyStore`], returning a handle to the store
pub async fn flaky_ledger(
    default_balance: Shards,
) -> Result<(Ledger<FlakyStore>, FlakyStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let store = FlakyStore::new(json_store(&temp_dir));
    let ledger = Ledger::open(store.clone(), default_balance).await?;
    Ok((ledger, store, temp_dir))
}

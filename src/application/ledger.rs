use tokio::sync::RwLock;

use crate::domain::{rank_top, AccountBalance, Balances, Shards};
use crate::storage::LedgerStore;

use super::LedgerError;

struct LedgerState {
    balances: Balances,
    /// Set when the last save failed: memory is ahead of the store.
    dirty: bool,
}

impl LedgerState {
    fn balance_or(&self, key: &str, default: Shards) -> Shards {
        self.balances.get(key).copied().unwrap_or(default)
    }
}

/// The shard ledger: balance invariants and queries over the map held by a [`LedgerStore`].
///
/// Every mutation holds the write lock across both the map change and the
/// store write, so a successful call is durable before the next mutation is
/// admitted. Queries share a read lock.
///
/// Construct one per process and share it by reference or `Arc`.
pub struct Ledger<S> {
    store: S,
    default_balance: Shards,
    state: RwLock<LedgerState>,
}

fn require(ok: bool, operation: &'static str, amount: Shards) -> Result<(), LedgerError> {
    if ok {
        Ok(())
    } else {
        Err(LedgerError::PreconditionViolation { operation, amount })
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// Load the full account map from `store`.
    /// Accounts seen for the first time start at `default_balance`.
    pub async fn open(store: S, default_balance: Shards) -> Result<Self, LedgerError> {
        require(default_balance >= 0, "open", default_balance)?;

        let balances = store.load().await.map_err(LedgerError::from_load)?;

        tracing::debug!(
            location = %store.location(),
            accounts = balances.len(),
            default_balance,
            "opened ledger"
        );

        Ok(Self {
            store,
            default_balance,
            state: RwLock::new(LedgerState {
                balances,
                dirty: false,
            }),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn default_balance(&self) -> Shards {
        self.default_balance
    }

    // ========================
    // Queries
    // ========================

    /// Balance for `key`, or the default if the account does not exist yet.
    /// Never creates the account.
    pub async fn balance(&self, key: &str) -> Shards {
        self.state.read().await.balance_or(key, self.default_balance)
    }

    pub async fn has_balance(&self, key: &str, amount: Shards) -> bool {
        self.balance(key).await >= amount
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.state.read().await.balances.contains_key(key)
    }

    pub async fn account_count(&self) -> usize {
        self.state.read().await.balances.len()
    }

    /// Snapshot of every account.
    pub async fn all_balances(&self) -> Balances {
        self.state.read().await.balances.clone()
    }

    /// Up to `n` accounts, richest first, ties by ascending key.
    pub async fn top_n(&self, n: usize) -> Vec<AccountBalance> {
        rank_top(&self.state.read().await.balances, n)
    }

    pub async fn is_dirty(&self) -> bool {
        self.state.read().await.dirty
    }

    // ========================
    // Mutations
    // ========================

    /// Create the account at the default balance if it is absent.
    /// Returns `true` when an account was created.
    pub async fn ensure_account(&self, key: &str) -> Result<bool, LedgerError> {
        let mut state = self.state.write().await;
        if state.balances.contains_key(key) {
            return Ok(false);
        }
        self.apply(&mut state, key, self.default_balance).await?;
        Ok(true)
    }

    pub async fn set_balance(&self, key: &str, amount: Shards) -> Result<(), LedgerError> {
        require(amount >= 0, "set_balance", amount)?;

        let mut state = self.state.write().await;
        self.apply(&mut state, key, amount).await
    }

    /// Credit `amount` and return the new balance.
    pub async fn add_balance(&self, key: &str, amount: Shards) -> Result<Shards, LedgerError> {
        require(amount > 0, "add_balance", amount)?;

        let mut state = self.state.write().await;
        let current = state.balance_or(key, self.default_balance);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                key: key.to_string(),
                balance: current,
                amount,
            })?;

        self.apply(&mut state, key, updated).await?;
        Ok(updated)
    }

    /// Debit `amount` if the account can cover it.
    /// Returns `false` without touching the balance or the store otherwise.
    pub async fn reduce_balance(&self, key: &str, amount: Shards) -> Result<bool, LedgerError> {
        require(amount > 0, "reduce_balance", amount)?;

        let mut state = self.state.write().await;
        let current = state.balance_or(key, self.default_balance);
        if current < amount {
            return Ok(false);
        }

        self.apply(&mut state, key, current - amount).await?;
        Ok(true)
    }

    // ========================
    // Persistence
    // ========================

    /// Write the whole map to the store, retrying any earlier failed save.
    pub async fn flush(&self) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        self.persist(&mut state).await
    }

    /// Final flush before the ledger is dropped.
    pub async fn shutdown(self) -> Result<(), LedgerError> {
        self.flush().await
    }

    async fn apply(
        &self,
        state: &mut LedgerState,
        key: &str,
        balance: Shards,
    ) -> Result<(), LedgerError> {
        state.balances.insert(key.to_string(), balance);
        self.persist(state).await
    }

    /// On failure the in-memory change is kept and the ledger is marked dirty;
    /// the next mutation or flush saves the full map again.
    async fn persist(&self, state: &mut LedgerState) -> Result<(), LedgerError> {
        match self.store.save(&state.balances).await {
            Ok(()) => {
                state.dirty = false;
                Ok(())
            }
            Err(e) => {
                state.dirty = true;
                Err(LedgerError::Persistence(e))
            }
        }
    }
}

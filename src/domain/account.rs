use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Shards;

/// The full account map: canonical key -> balance.
/// Iteration is in ascending key order, which the leaderboard relies on for ties.
pub type Balances = BTreeMap<String, Shards>;

/// A single (key, balance) record as returned to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub key: String,
    pub balance: Shards,
}

impl AccountBalance {
    pub fn new(key: impl Into<String>, balance: Shards) -> Self {
        Self {
            key: key.into(),
            balance,
        }
    }
}

/// Find the first account whose balance breaks the non-negative invariant.
pub fn find_negative_balance(balances: &Balances) -> Option<AccountBalance> {
    balances
        .iter()
        .find(|(_, balance)| **balance < 0)
        .map(|(key, balance)| AccountBalance::new(key.clone(), *balance))
}

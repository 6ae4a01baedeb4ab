use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::Ledger;
use crate::domain::{AccountBalance, Shards};
use crate::storage::LedgerStore;

/// Point-in-time snapshot of the ledger for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub default_balance: Shards,
    pub accounts: Vec<AccountBalance>,
}

/// A ranked leaderboard row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedEntry {
    pub position: usize,
    pub key: String,
    pub balance: Shards,
}

/// Exporter for converting ledger data to CSV or JSON
pub struct Exporter<'a, S> {
    ledger: &'a Ledger<S>,
}

impl<'a, S: LedgerStore> Exporter<'a, S> {
    pub fn new(ledger: &'a Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Export every account, ordered by key, to CSV format
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let balances = self.ledger.all_balances().await;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["key", "balance"])?;

        let mut count = 0;
        for (key, balance) in &balances {
            csv_writer.write_record([key.clone(), balance.to_string()])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the top `limit` accounts to CSV format
    pub async fn export_top_csv<W: Write>(&self, writer: W, limit: usize) -> Result<usize> {
        let ranked = self.ranked(limit).await;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["position", "key", "balance"])?;
        for entry in &ranked {
            csv_writer.write_record([
                entry.position.to_string(),
                entry.key.clone(),
                entry.balance.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(ranked.len())
    }

    /// Export every account as a JSON snapshot
    pub async fn export_balances_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let accounts = self
            .ledger
            .all_balances()
            .await
            .into_iter()
            .map(|(key, balance)| AccountBalance { key, balance })
            .collect();

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            default_balance: self.ledger.default_balance(),
            accounts,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(snapshot)
    }

    /// Export the top `limit` accounts as a JSON array
    pub async fn export_top_json<W: Write>(&self, mut writer: W, limit: usize) -> Result<usize> {
        let ranked = self.ranked(limit).await;

        serde_json::to_writer_pretty(&mut writer, &ranked)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(ranked.len())
    }

    async fn ranked(&self, limit: usize) -> Vec<RankedEntry> {
        self.ledger
            .top_n(limit)
            .await
            .into_iter()
            .enumerate()
            .map(|(i, entry)| RankedEntry {
                position: i + 1,
                key: entry.key,
                balance: entry.balance,
            })
            .collect()
    }
}

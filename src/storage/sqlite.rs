use std::path::Path;

use sqlx::{Row, SqlitePool};

use crate::domain::{find_negative_balance, Balances, Shards};

use super::{LedgerStore, StoreError, MIGRATION_001_ACCOUNTS};

/// SQLite result code for "file is not a database".
const SQLITE_NOTADB: &str = "26";

/// Columns the `accounts` table must carry for loads and saves to work.
const ACCOUNT_COLUMNS: [&str; 2] = ["key", "balance"];

/// Ledger store backed by a single SQLite table.
/// A save replaces every row inside one transaction.
pub struct SqliteStore {
    pool: SqlitePool,
    location: String,
}

impl SqliteStore {
    /// Create a store over an existing connection pool and run migrations.
    pub async fn new(pool: SqlitePool, location: impl Into<String>) -> Result<Self, StoreError> {
        let store = Self {
            pool,
            location: location.into(),
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let location = path.display().to_string();
        let database_url = format!("sqlite:{}?mode=rwc", location);

        let pool = SqlitePool::connect(&database_url)
            .await
            .map_err(|e| classify(&location, e))?;

        Self::new(pool, location).await
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(MIGRATION_001_ACCOUNTS)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(&self.location, e))?;
        self.verify_schema().await
    }

    /// `CREATE TABLE IF NOT EXISTS` keeps a foreign `accounts` table as is,
    /// so check it has the columns this store reads and writes.
    async fn verify_schema(&self) -> Result<(), StoreError> {
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('accounts')")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| classify(&self.location, e))?;

        let missing: Vec<&str> = ACCOUNT_COLUMNS
            .iter()
            .copied()
            .filter(|wanted| !columns.iter().any(|c| c == wanted))
            .collect();

        if !missing.is_empty() {
            return Err(StoreError::Corrupt {
                location: self.location.clone(),
                reason: format!(
                    "table 'accounts' is missing column(s) {}",
                    missing.join(", ")
                ),
            });
        }
        Ok(())
    }

    /// Close the underlying pool, waiting for connections to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Map a sqlx error onto the store taxonomy: unreadable data or a schema that
/// is not ours is corruption, everything else is a database failure.
fn classify(location: &str, error: sqlx::Error) -> StoreError {
    let corrupt = match &error {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(SQLITE_NOTADB)
                || ["not a database", "no such column", "no such table"]
                    .iter()
                    .any(|m| db.message().contains(m))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => true,
        _ => false,
    };

    if corrupt {
        StoreError::Corrupt {
            location: location.to_string(),
            reason: error.to_string(),
        }
    } else {
        StoreError::Database {
            location: location.to_string(),
            source: error,
        }
    }
}

impl LedgerStore for SqliteStore {
    async fn load(&self) -> Result<Balances, StoreError> {
        let rows = sqlx::query("SELECT key, balance FROM accounts ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(&self.location, e))?;

        let mut balances = Balances::new();
        for row in &rows {
            let key: String = row
                .try_get("key")
                .map_err(|e| classify(&self.location, e))?;
            let balance: Shards = row
                .try_get("balance")
                .map_err(|e| classify(&self.location, e))?;
            balances.insert(key, balance);
        }

        if let Some(bad) = find_negative_balance(&balances) {
            return Err(StoreError::Corrupt {
                location: self.location.clone(),
                reason: format!("account '{}' has negative balance {}", bad.key, bad.balance),
            });
        }

        tracing::debug!(
            location = %self.location,
            accounts = balances.len(),
            "loaded ledger table"
        );
        Ok(balances)
    }

    async fn save(&self, balances: &Balances) -> Result<(), StoreError> {
        let db_error = |source: sqlx::Error| StoreError::Database {
            location: self.location.clone(),
            source,
        };

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("DELETE FROM accounts")
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for (key, balance) in balances {
            sqlx::query("INSERT INTO accounts (key, balance) VALUES (?, ?)")
                .bind(key.as_str())
                .bind(*balance)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;

        tracing::debug!(
            location = %self.location,
            accounts = balances.len(),
            "saved ledger table"
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, MapPreventDuplicates};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::{find_negative_balance, Balances};

use super::{LedgerStore, StoreError};

/// On-disk shape of the ledger document.
/// Unknown top-level fields are ignored so newer writers stay readable.
/// A key repeated inside `accounts` is an error, never last-one-wins.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde_as(as = "MapPreventDuplicates<_, _>")]
    pub accounts: Balances,
}

#[derive(Serialize)]
struct LedgerDocumentRef<'a> {
    saved_at: DateTime<Utc>,
    accounts: &'a Balances,
}

/// Decode a ledger document, rejecting anything that is not key -> non-negative integer.
pub fn decode_document(bytes: &[u8]) -> Result<Balances, String> {
    let document: LedgerDocument = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

    if let Some(bad) = find_negative_balance(&document.accounts) {
        return Err(format!(
            "account '{}' has negative balance {}",
            bad.key, bad.balance
        ));
    }

    Ok(document.accounts)
}

/// Encode the map as a pretty-printed ledger document stamped with `saved_at`.
pub fn encode_document(balances: &Balances, saved_at: DateTime<Utc>) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(&LedgerDocumentRef {
        saved_at,
        accounts: balances,
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Ledger store backed by a single JSON document.
/// Saves go to a sibling temp file which is then renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temp file next to the target, so the rename never crosses filesystems.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            location: self.location(),
            source,
        }
    }

    async fn write_temp(tmp: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(())
    }
}

/// Flush the directory entry of `path` so a completed rename survives power loss.
#[cfg(unix)]
pub async fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::File::open(parent).await?.sync_all().await
}

/// Directories cannot be opened as files here; the rename is as durable as it gets.
#[cfg(not(unix))]
pub async fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl LedgerStore for JsonFileStore {
    async fn load(&self) -> Result<Balances, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no ledger document yet, starting empty");
                return Ok(Balances::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let balances = decode_document(&bytes).map_err(|reason| StoreError::Corrupt {
            location: self.location(),
            reason,
        })?;

        tracing::debug!(
            path = %self.path.display(),
            accounts = balances.len(),
            "loaded ledger document"
        );
        Ok(balances)
    }

    async fn save(&self, balances: &Balances) -> Result<(), StoreError> {
        let bytes = encode_document(balances, Utc::now())
            .map_err(|e| self.io_error(std::io::Error::from(e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let tmp = self.temp_path();
        if let Err(e) = Self::write_temp(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(self.io_error(e));
        }

        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(self.io_error(e));
        }

        sync_parent_dir(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        tracing::debug!(
            path = %self.path.display(),
            accounts = balances.len(),
            bytes = bytes.len(),
            "saved ledger document"
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::Shards;

pub const DEFAULT_CONFIG_FILE: &str = "shardledger.json";
pub const DEFAULT_DATA_FILE: &str = "shards.json";
pub const DEFAULT_TOP_LIMIT: usize = 10;

/// Which [`LedgerStore`](crate::storage::LedgerStore) backs the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Json => "json",
            StoreBackend::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Host configuration, read from a kebab-case JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LedgerConfig {
    pub data_path: PathBuf,
    pub backend: StoreBackend,
    pub default_shard: Shards,
    pub top_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_FILE),
            backend: StoreBackend::Json,
            default_shard: 0,
            top_limit: DEFAULT_TOP_LIMIT,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file {}", path.display()));
            }
        };

        let config = Self::from_json(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_shard < 0 {
            bail!("default-shard must be 0 or greater, got {}", self.default_shard);
        }
        if self.top_limit == 0 {
            bail!("top-limit must be greater than 0");
        }
        if self.data_path.as_os_str().is_empty() {
            bail!("data-path must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.data_path, PathBuf::from("shards.json"));
        assert_eq!(config.backend, StoreBackend::Json);
        assert_eq!(config.default_shard, 0);
        assert_eq!(config.top_limit, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = LedgerConfig::from_json(r#"{ "default-shard": 25, "backend": "sqlite" }"#)
            .unwrap();
        assert_eq!(config.default_shard, 25);
        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.top_limit, DEFAULT_TOP_LIMIT);
    }

    #[test]
    fn test_from_json_rejects_negative_default() {
        assert!(LedgerConfig::from_json(r#"{ "default-shard": -1 }"#).is_err());
    }

    #[test]
    fn test_from_json_rejects_zero_top_limit() {
        assert!(LedgerConfig::from_json(r#"{ "top-limit": 0 }"#).is_err());
    }

    #[test]
    fn test_from_json_rejects_unknown_backend() {
        assert!(LedgerConfig::from_json(r#"{ "backend": "yaml" }"#).is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LedgerConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shardledger.json");
        std::fs::write(&path, r#"{ "data-path": "data/ledger.db", "top-limit": 3 }"#).unwrap();

        let config = LedgerConfig::load(&path).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/ledger.db"));
        assert_eq!(config.top_limit, 3);
    }
}

pub mod identity;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::Ledger;
use crate::config::{LedgerConfig, StoreBackend, DEFAULT_CONFIG_FILE};
use crate::domain::{parse_credit_amount, parse_set_amount, AccountBalance, Shards};
use crate::storage::{JsonFileStore, LedgerStore, SqliteStore};

use identity::{canonical_key, resolve_target};

/// Shardledger - shard balances and leaderboard
#[derive(Parser)]
#[command(name = "shardledger")]
#[command(about = "A durable per-player shard ledger with a leaderboard")]
#[command(version)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Ledger data file (overrides the config file)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(long, value_enum)]
    pub backend: Option<StoreBackend>,

    /// Starting balance for new accounts (overrides the config file)
    #[arg(long, allow_hyphen_values = true)]
    pub default_shard: Option<Shards>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a player, creating their account at the default balance
    Login {
        /// Player name
        name: String,
    },

    /// Show a player's shard balance
    Shard {
        /// Player name
        name: String,
    },

    /// Give shards to a player
    Give {
        /// Player name or prefix
        target: String,

        /// Amount to give (greater than 0)
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Take shards from a player
    Take {
        /// Player name or prefix
        target: String,

        /// Amount to take (greater than 0)
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Set a player's shard balance
    Set {
        /// Player name or prefix
        target: String,

        /// New balance (0 or greater)
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Show the shard leaderboard
    Top {
        /// Number of players to show (defaults to top-limit from the config)
        #[arg(short, long, value_parser = parse_limit)]
        limit: Option<usize>,
    },

    /// Export balances or the leaderboard to CSV or JSON
    Export {
        /// What to export: balances, top
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (default: csv)
        #[arg(short, long)]
        format: Option<String>,

        /// Number of players for the top export
        #[arg(short, long, value_parser = parse_limit)]
        limit: Option<usize>,
    },
}

/// Leaderboard sizes must name at least one player.
fn parse_limit(input: &str) -> Result<usize, String> {
    match input.trim().parse::<usize>() {
        Ok(0) => Err("limit must be greater than 0".to_string()),
        Ok(limit) => Ok(limit),
        Err(e) => Err(format!("invalid limit '{}': {}", input, e)),
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

impl Cli {
    /// Config file values with command line overrides applied.
    pub fn resolve_config(&self) -> Result<LedgerConfig> {
        let mut config = LedgerConfig::load(&self.config)?;

        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(default_shard) = self.default_shard {
            config.default_shard = default_shard;
        }

        config.validate()?;
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        init_tracing(self.verbose);
        let config = self.resolve_config()?;

        tracing::debug!(
            data = %config.data_path.display(),
            backend = %config.backend,
            default_shard = config.default_shard,
            "starting"
        );

        match config.backend {
            StoreBackend::Json => {
                let store = JsonFileStore::new(&config.data_path);
                execute(store, &config, self.command).await
            }
            StoreBackend::Sqlite => {
                let store = SqliteStore::open(&config.data_path)
                    .await
                    .with_context(|| {
                        format!("Failed to open database {}", config.data_path.display())
                    })?;
                execute(store, &config, self.command).await
            }
        }
    }
}

async fn execute<S: LedgerStore>(store: S, config: &LedgerConfig, command: Commands) -> Result<()> {
    let ledger = Ledger::open(store, config.default_shard)
        .await
        .with_context(|| format!("Failed to open ledger {}", config.data_path.display()))?;

    let outcome = run_command(&ledger, config, command).await;

    if ledger.is_dirty().await {
        tracing::warn!(
            location = %ledger.store().location(),
            "ledger has unsaved changes, retrying save on shutdown"
        );
    }

    let closed = ledger.shutdown().await;
    outcome?;
    closed.context("Failed to save ledger on shutdown")?;
    Ok(())
}

async fn run_command<S: LedgerStore>(
    ledger: &Ledger<S>,
    config: &LedgerConfig,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Login { name } => {
            let key = canonical_key(&name);
            if ledger.ensure_account(&key).await? {
                println!(
                    "Registered {} with {} shards",
                    key,
                    ledger.default_balance()
                );
            } else {
                println!("{} is already registered", key);
            }
        }

        Commands::Shard { name } => {
            let key = canonical_key(&name);
            let balance = ledger.balance(&key).await;
            println!("{}: {} shards", key, balance);
        }

        Commands::Give { target, amount } => {
            let amount = parse_credit_amount(&amount)?;
            let key = resolve_target(&target, &ledger.all_balances().await)?;
            let balance = ledger.add_balance(&key, amount).await?;
            println!("Gave {} shards to {} (balance: {})", amount, key, balance);
        }

        Commands::Take { target, amount } => {
            let amount = parse_credit_amount(&amount)?;
            let key = resolve_target(&target, &ledger.all_balances().await)?;
            if ledger.reduce_balance(&key, amount).await? {
                println!(
                    "Took {} shards from {} (balance: {})",
                    amount,
                    key,
                    ledger.balance(&key).await
                );
            } else {
                println!("{} only has {} shards!", key, ledger.balance(&key).await);
            }
        }

        Commands::Set { target, amount } => {
            let amount = parse_set_amount(&amount)?;
            let key = resolve_target(&target, &ledger.all_balances().await)?;
            ledger.set_balance(&key, amount).await?;
            println!("Set {}'s shard balance to {}", key, amount);
        }

        Commands::Top { limit } => {
            run_top_command(ledger, limit.unwrap_or(config.top_limit)).await;
        }

        Commands::Export {
            export_type,
            output,
            format,
            limit,
        } => {
            run_export_command(
                ledger,
                &export_type,
                output.as_deref(),
                format.as_deref(),
                limit.unwrap_or(config.top_limit),
            )
            .await?;
        }
    }
    Ok(())
}

async fn run_top_command<S: LedgerStore>(ledger: &Ledger<S>, limit: usize) {
    for line in leaderboard_lines(&ledger.top_n(limit).await) {
        println!("{}", line);
    }
}

/// Render ranked entries; the header counts the rows actually shown.
fn leaderboard_lines(entries: &[AccountBalance]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No data available!".to_string()];
    }

    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(format!("--- Top {} Shard Leaders ---", entries.len()));
    for (i, entry) in entries.iter().enumerate() {
        lines.push(format!(
            "#{:<3} {:<20} {:>12} shards",
            i + 1,
            entry.key,
            entry.balance
        ));
    }
    lines
}

async fn run_export_command<S: LedgerStore>(
    ledger: &Ledger<S>,
    export_type: &str,
    output: Option<&str>,
    format: Option<&str>,
    limit: usize,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(ledger);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let json = match format.unwrap_or("csv") {
        "csv" => false,
        "json" => true,
        other => anyhow::bail!("Invalid format '{}'. Valid formats: csv, json", other),
    };

    let count = match (export_type, json) {
        ("balances", false) => exporter.export_balances_csv(writer).await?,
        ("balances", true) => exporter.export_balances_json(writer).await?.accounts.len(),
        ("top", false) => exporter.export_top_csv(writer, limit).await?,
        ("top", true) => exporter.export_top_json(writer, limit).await?,
        _ => anyhow::bail!(
            "Invalid export type '{}'. Valid types: balances, top",
            export_type
        ),
    };

    if output.is_some() {
        eprintln!("Exported {} accounts", count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit("3"), Ok(3));
        assert_eq!(parse_limit(" 10 "), Ok(10));
        assert!(parse_limit("0").is_err());
        assert!(parse_limit("-1").is_err());
        assert!(parse_limit("ten").is_err());
    }

    #[test]
    fn test_leaderboard_header_counts_shown_rows() {
        let entries = vec![AccountBalance::new("steve", 9), AccountBalance::new("alex", 0)];
        let lines = leaderboard_lines(&entries);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "--- Top 2 Shard Leaders ---");
        assert!(lines[1].starts_with("#1"));
        assert!(lines[1].contains("steve"));
        assert!(lines[2].contains("alex"));
    }

    #[test]
    fn test_leaderboard_empty() {
        assert_eq!(leaderboard_lines(&[]), vec!["No data available!"]);
    }
}

mod common;

use anyhow::Result;
use shardledger::domain::AccountBalance;

use common::{reopen, test_ledger};

#[tokio::test]
async fn test_top_n_empty_ledger() -> Result<()> {
    let (ledger, _temp) = test_ledger(0).await?;

    assert!(ledger.top_n(10).await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_top_n_zero() -> Result<()> {
    let (ledger, _temp) = test_ledger(0).await?;
    ledger.set_balance("alice", 5).await?;

    assert!(ledger.top_n(0).await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_top_n_ordering_and_length() -> Result<()> {
    let (ledger, _temp) = test_ledger(0).await?;

    let players = [
        ("steve", 40),
        ("alex", 250),
        ("notch", 1_000_000),
        ("jeb", 40),
        ("dinnerbone", 0),
        ("grumm", 75),
    ];
    for (name, shards) in players {
        ledger.set_balance(name, shards).await?;
    }

    let top = ledger.top_n(4).await;
    assert_eq!(top.len(), 4);
    assert!(top.windows(2).all(|w| w[0].balance >= w[1].balance));
    assert_eq!(
        top,
        vec![
            AccountBalance::new("notch", 1_000_000),
            AccountBalance::new("alex", 250),
            AccountBalance::new("grumm", 75),
            AccountBalance::new("jeb", 40),
        ]
    );

    // Asking for more than exists returns everyone
    assert_eq!(ledger.top_n(100).await.len(), players.len());

    Ok(())
}

#[tokio::test]
async fn test_top_n_ties_are_reproducible_across_restarts() -> Result<()> {
    let (ledger, temp) = test_ledger(0).await?;

    // Insert in an order unrelated to the key order
    for name in ["mike", "zara", "anna", "lee"] {
        ledger.set_balance(name, 10).await?;
    }
    let before: Vec<String> = ledger.top_n(4).await.into_iter().map(|e| e.key).collect();
    assert_eq!(before, vec!["anna", "lee", "mike", "zara"]);

    drop(ledger);
    let restarted = reopen(&temp, 0).await?;
    let after: Vec<String> = restarted
        .top_n(4)
        .await
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(before, after);

    Ok(())
}

#[tokio::test]
async fn test_top_n_reflects_debits() -> Result<()> {
    let (ledger, _temp) = test_ledger(0).await?;
    ledger.set_balance("alice", 100).await?;
    ledger.set_balance("bob", 60).await?;

    assert_eq!(ledger.top_n(1).await[0].key, "alice");

    assert!(ledger.reduce_balance("alice", 50).await?);
    assert_eq!(ledger.top_n(1).await[0], AccountBalance::new("bob", 60));

    Ok(())
}

#[tokio::test]
async fn test_top_n_excludes_unseen_accounts() -> Result<()> {
    let (ledger, _temp) = test_ledger(500).await?;
    ledger.set_balance("alice", 1).await?;

    // Reading a default balance does not put anyone on the board
    assert_eq!(ledger.balance("ghost").await, 500);
    assert_eq!(ledger.top_n(10).await, vec![AccountBalance::new("alice", 1)]);

    Ok(())
}

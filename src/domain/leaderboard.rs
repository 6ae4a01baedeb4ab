use super::{AccountBalance, Balances, Shards};

/// Rank accounts by balance, highest first, keeping at most `limit` entries.
/// Equal balances are ordered by ascending key so the result is reproducible.
pub fn rank_top(balances: &Balances, limit: usize) -> Vec<AccountBalance> {
    if limit == 0 || balances.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(&String, &Shards)> = balances.iter().collect();
    // Stable sort over key-ordered input keeps ties in ascending key order.
    ranked.sort_by(|a, b| b.1.cmp(a.1));

    ranked
        .into_iter()
        .take(limit)
        .map(|(key, balance)| AccountBalance::new(key.clone(), *balance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balances(entries: &[(&str, i64)]) -> Balances {
        entries
            .iter()
            .map(|(key, balance)| (key.to_string(), *balance))
            .collect()
    }

    #[test]
    fn test_rank_top_empty() {
        assert!(rank_top(&Balances::new(), 10).is_empty());
    }

    #[test]
    fn test_rank_top_zero_limit() {
        let b = balances(&[("alice", 5)]);
        assert!(rank_top(&b, 0).is_empty());
    }

    #[test]
    fn test_rank_top_orders_descending() {
        let b = balances(&[("alice", 5), ("bob", 100), ("carol", 30)]);
        let top = rank_top(&b, 10);

        assert_eq!(
            top,
            vec![
                AccountBalance::new("bob", 100),
                AccountBalance::new("carol", 30),
                AccountBalance::new("alice", 5),
            ]
        );
    }

    #[test]
    fn test_rank_top_truncates() {
        let b = balances(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]);
        let top = rank_top(&b, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, "d");
        assert_eq!(top[1].key, "c");
    }

    #[test]
    fn test_rank_top_ties_by_key() {
        let b = balances(&[("zed", 10), ("amy", 10), ("max", 10), ("bo", 20)]);
        let keys: Vec<String> = rank_top(&b, 10).into_iter().map(|e| e.key).collect();

        assert_eq!(keys, vec!["bo", "amy", "max", "zed"]);
    }

    #[test]
    fn test_rank_top_is_non_increasing() {
        let b = balances(&[
            ("a", 7),
            ("b", 0),
            ("c", 7),
            ("d", 1_000_000_000_000),
            ("e", 3),
        ]);
        let top = rank_top(&b, 5);

        assert!(top.windows(2).all(|w| w[0].balance >= w[1].balance));
    }
}

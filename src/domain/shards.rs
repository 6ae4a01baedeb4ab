use thiserror::Error;

/// Shard balances are whole, non-negative integers.
/// The signed type lets callers express (and the ledger reject) negative amounts.
pub type Shards = i64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount '{0}': expected a whole number")]
    InvalidFormat(String),

    #[error("amount must be greater than 0, got {0}")]
    NotPositive(Shards),

    #[error("amount must be 0 or greater, got {0}")]
    Negative(Shards),
}

/// Parse a whole number of shards, accepting surrounding whitespace and a leading '+'.
/// Example: "50" -> 50, " 7 " -> 7, "-3" -> -3
pub fn parse_shards(input: &str) -> Result<Shards, AmountError> {
    input
        .trim()
        .parse::<Shards>()
        .map_err(|_| AmountError::InvalidFormat(input.to_string()))
}

/// Parse an amount for a credit or debit (give/take): must be strictly positive.
pub fn parse_credit_amount(input: &str) -> Result<Shards, AmountError> {
    let amount = parse_shards(input)?;
    if amount <= 0 {
        return Err(AmountError::NotPositive(amount));
    }
    Ok(amount)
}

/// Parse an amount for an absolute assignment (set): zero is allowed.
pub fn parse_set_amount(input: &str) -> Result<Shards, AmountError> {
    let amount = parse_shards(input)?;
    if amount < 0 {
        return Err(AmountError::Negative(amount));
    }
    Ok(amount)
}

//! Identity resolution for the command line host.
//!
//! The ledger only ever sees canonical keys. Turning what a user typed into
//! one of those keys happens here.

use thiserror::Error;

use crate::domain::Balances;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Player {0} not found!")]
pub struct IdentityNotFound(pub String);

/// Canonical account key for a display name.
pub fn canonical_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Find the known key a partial name refers to.
///
/// An exact match wins. Otherwise the shortest key starting with `prefix`
/// is chosen, with ties going to the lowest key.
pub fn find_by_prefix<'a, I>(prefix: &str, known: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    if prefix.is_empty() {
        return None;
    }

    let mut best: Option<&'a str> = None;
    for key in known {
        if key == prefix {
            return Some(key.as_str());
        }
        if !key.starts_with(prefix) {
            continue;
        }
        best = match best {
            Some(current) if (current.len(), current) <= (key.len(), key.as_str()) => Some(current),
            _ => Some(key.as_str()),
        };
    }
    best
}

/// Resolve a user-supplied target name against the accounts the ledger knows.
pub fn resolve_target(raw: &str, balances: &Balances) -> Result<String, IdentityNotFound> {
    let prefix = canonical_key(raw);
    find_by_prefix(&prefix, balances.keys())
        .map(str::to_string)
        .ok_or_else(|| IdentityNotFound(raw.trim().to_string()))
}

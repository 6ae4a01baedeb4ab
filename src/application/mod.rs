// Application layer: the ledger and its error taxonomy.
// Hosts (the CLI, or an embedding server) hold one Ledger and call into it.

pub mod error;
pub mod ledger;

pub use error::*;
pub use ledger::*;

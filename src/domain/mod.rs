mod account;
mod leaderboard;
mod shards;

pub use account::*;
pub use leaderboard::*;
pub use shards::*;

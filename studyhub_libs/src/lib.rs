pub mod api;
pub mod leaderboard;
pub mod migration;
pub mod models;
pub mod store;

pub use leaderboard::{rank_peers, LeaderboardAggregator, LeaderboardEntry, DEFAULT_LIMIT};
pub use store::{Store, StoreError};

use crate::cmd::connect;
use anyhow::{Context, Result};
use clap::Args;
use studyhub_libs::{models::UserId, store::PgStore, LeaderboardAggregator, DEFAULT_LIMIT};

#[derive(Debug, Args)]
pub struct LeaderboardArgs {
    #[arg(long)]
    user_id: i32,
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: u32,
}

/// Prints the friend leaderboard of a user as JSON.
pub async fn run(args: LeaderboardArgs) -> Result<()> {
    if args.limit == 0 {
        let message = "--limit must be at least 1";
        tracing::error!(message);
        anyhow::bail!(message)
    }

    let pool = connect().await?;
    let aggregator = LeaderboardAggregator::new(PgStore::new(pool));

    let user = UserId(args.user_id);
    let entries = aggregator
        .compute_leaderboard(user, args.limit)
        .await
        .with_context(|| {
            let message = format!("failed to compute leaderboard of user {}", user);
            tracing::error!(message);
            message
        })?;

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

use crate::modules::{auth::SessionUser, error::RpcError, models::request::ValidatedInput};
use axum::{extract::Extension, Json};
use std::sync::Arc;
use studyhub_libs::{
    api::{LeaderboardInput, RpcResponse},
    LeaderboardAggregator, LeaderboardEntry, Store,
};

/// `leaderboard.getFriendLeaderboard`
pub async fn get_friend_leaderboard<S>(
    SessionUser(user): SessionUser,
    ValidatedInput(input): ValidatedInput<LeaderboardInput>,
    Extension(aggregator): Extension<Arc<LeaderboardAggregator<S>>>,
) -> Result<Json<RpcResponse<Vec<LeaderboardEntry>>>, RpcError>
where
    S: Store + 'static,
{
    let entries = aggregator.compute_leaderboard(user, input.limit()).await?;
    Ok(Json(RpcResponse::new(entries)))
}

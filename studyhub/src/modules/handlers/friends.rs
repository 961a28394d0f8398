use crate::modules::{auth::SessionUser, error::RpcError, models::request::ValidatedJson};
use axum::{extract::Extension, Json};
use studyhub_libs::{
    api::{AcceptFriendInput, AddFriendInput, RpcResponse},
    models::{FriendSummary, Friendship},
    Store,
};

/// `friends.list`
pub async fn list_friends<S>(
    SessionUser(user): SessionUser,
    Extension(store): Extension<S>,
) -> Result<Json<RpcResponse<Vec<FriendSummary>>>, RpcError>
where
    S: Store + Clone + 'static,
{
    let friends = store.list_friends(user).await?;
    Ok(Json(RpcResponse::new(friends)))
}

/// `friends.add`
pub async fn add_friend<S>(
    SessionUser(user): SessionUser,
    Extension(store): Extension<S>,
    ValidatedJson(input): ValidatedJson<AddFriendInput>,
) -> Result<Json<RpcResponse<Friendship>>, RpcError>
where
    S: Store + Clone + 'static,
{
    let friend = input.friend();
    if friend == user {
        return Err(RpcError::BadRequest(String::from(
            "cannot add yourself as a friend",
        )));
    }

    let friendship = store.add_friend(user, friend).await?;
    Ok(Json(RpcResponse::new(friendship)))
}

/// `friends.accept`
pub async fn accept_friend<S>(
    SessionUser(user): SessionUser,
    Extension(store): Extension<S>,
    ValidatedJson(input): ValidatedJson<AcceptFriendInput>,
) -> Result<Json<RpcResponse<Friendship>>, RpcError>
where
    S: Store + Clone + 'static,
{
    match store
        .accept_friend_request(input.friendship_id, user)
        .await?
    {
        Some(friendship) => Ok(Json(RpcResponse::new(friendship))),
        None => Err(RpcError::NotFound(format!(
            "no pending friend request {} addressed to you",
            input.friendship_id
        ))),
    }
}

pub mod activity;
pub mod friends;
pub mod leaderboard;

use crate::modules::error::RpcError;
use axum::{
    extract::Extension,
    http::{StatusCode, Uri},
};
use studyhub_libs::Store;

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

pub async fn readiness<S>(Extension(store): Extension<S>) -> StatusCode
where
    S: Store + Clone + 'static,
{
    match store.ping().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("readiness check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn not_found(uri: Uri) -> RpcError {
    RpcError::NotFound(format!("no procedure at {}", uri.path()))
}

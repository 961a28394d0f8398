use crate::modules::error::RpcError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::header::{AUTHORIZATION, COOKIE},
    http::HeaderMap,
};
use http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studyhub_libs::models::UserId;

pub const SESSION_COOKIE: &str = "app_session_id";

/// Claims of a session token. `sub` carries the numeric user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Verifies session tokens issued by the authentication service.
#[derive(Clone)]
pub struct SessionKeys {
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<UserId, RpcError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::warn!("rejected session token: {}", e);
                RpcError::Unauthorized(String::from("invalid or expired session"))
            })?
            .claims;

        claims
            .sub
            .parse::<i32>()
            .map(UserId)
            .map_err(|_| RpcError::Unauthorized(String::from("invalid session subject")))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// The authenticated caller, taken from the bearer token or the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let keys = parts
            .extensions
            .get::<Arc<SessionKeys>>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("session keys are not configured");
                RpcError::Internal
            })?;

        let token = bearer_token(&parts.headers)
            .or_else(|| session_cookie(&parts.headers))
            .ok_or_else(|| RpcError::Unauthorized(String::from("missing session")))?;

        keys.verify(token).map(SessionUser)
    }
}

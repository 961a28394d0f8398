use crate::modules::error::RpcError;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    BoxError, Json,
};
use http::{request::Parts, Request};
use http_body::Body as HttpBody;
use serde::{de::DeserializeOwned, Deserialize};
use validator::Validate;

#[derive(Debug, Deserialize)]
struct RawInput {
    input: Option<String>,
}

/// Query procedure input, carried as URL-encoded JSON in the `input` query parameter.
///
/// A missing `input` parameter means `T::default()`.
pub struct ValidatedInput<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedInput<T>
where
    T: DeserializeOwned + Validate + Default,
    S: Send + Sync,
{
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        let raw: RawInput = serde_urlencoded::from_str(query).map_err(|rejection| {
            tracing::error!("Parsing error: {}", rejection);
            RpcError::BadRequest(format!("invalid format query string: [{}]", rejection))
        })?;

        let value: T = match raw.input {
            Some(input) => serde_json::from_str(&input).map_err(|rejection| {
                tracing::error!("Parsing error: {}", rejection);
                RpcError::BadRequest(format!("invalid input: [{}]", rejection))
            })?,
            None => T::default(),
        };

        validate(&value)?;
        Ok(ValidatedInput(value))
    }
}

/// Mutation procedure input, carried as a JSON body.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = RpcError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                tracing::error!("Parsing error: {}", rejection);
                RpcError::BadRequest(format!("invalid request body: [{}]", rejection))
            })?;

        validate(&value)?;
        Ok(ValidatedJson(value))
    }
}

fn validate(value: &impl Validate) -> Result<(), RpcError> {
    value.validate().map_err(|rejection| {
        tracing::error!("Validation error: {}", rejection);
        RpcError::BadRequest(format!("Validation error: [{}]", rejection).replace('\n', ", "))
    })
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use studyhub_libs::{
    api::{RpcErrorBody, RpcErrorResponse},
    StoreError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("request timed out")]
    Timeout,
    #[error("data store is unavailable, try again later")]
    Unavailable,
    #[error("unexpected error")]
    Internal,
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::Conflict(_) => StatusCode::CONFLICT,
            RpcError::Timeout => StatusCode::REQUEST_TIMEOUT,
            RpcError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            RpcError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RpcError::BadRequest(_) => "BAD_REQUEST",
            RpcError::Unauthorized(_) => "UNAUTHORIZED",
            RpcError::NotFound(_) => "NOT_FOUND",
            RpcError::Conflict(_) => "CONFLICT",
            RpcError::Timeout => "TIMEOUT",
            RpcError::Unavailable => "SERVICE_UNAVAILABLE",
            RpcError::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<StoreError> for RpcError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(cause) => {
                tracing::error!("data store is unavailable: {}", cause);
                RpcError::Unavailable
            }
            StoreError::Conflict(message) => RpcError::Conflict(message),
            StoreError::NotFound(message) => RpcError::NotFound(message),
            StoreError::Query(e) => {
                tracing::error!("request failed cause: {:?}", e);
                RpcError::Internal
            }
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = RpcErrorResponse {
            error: RpcErrorBody {
                message: self.to_string(),
                code: String::from(self.code()),
                http_status: status.as_u16(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Maps failures raised by middleware, such as the request deadline, into the error envelope.
pub async fn handle_layer_error(error: BoxError) -> RpcError {
    if error.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("request timed out");
        RpcError::Timeout
    } else {
        tracing::error!("unhandled middleware error: {}", error);
        RpcError::Internal
    }
}

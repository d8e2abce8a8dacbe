//! API error handling.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unavailable(String),
    Timeout(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<buildstore_core::Error> for ApiError {
    fn from(err: buildstore_core::Error) -> Self {
        use buildstore_core::Error;

        match err {
            Error::NotFound(_) => ApiError::NotFound(err.to_string()),
            Error::AlreadyExists(_) => ApiError::Conflict(err.to_string()),
            Error::InvalidInput(_) | Error::Decode(_) | Error::UnknownParser(_) => {
                ApiError::BadRequest(err.to_string())
            }
            Error::Storage(_) => ApiError::Unavailable(err.to_string()),
            Error::Cancelled | Error::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

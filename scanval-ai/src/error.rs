//! Error types for the scanval-ai HTTP surface
//!
//! Upstream failures never reach this layer; they degrade into the
//! consensus result. Only malformed requests do.

use crate::orchestrator::RequestInvalid;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request rejected before any external call (400)
    #[error("Invalid request: {0}")]
    RequestInvalid(#[from] RequestInvalid),

    /// Body was not a usable JSON document (400)
    #[error("Invalid request body: {0}")]
    BadBody(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::RequestInvalid(ref err) => {
                (StatusCode::BAD_REQUEST, "REQUEST_INVALID", err.to_string())
            }
            ApiError::BadBody(msg) => (StatusCode::BAD_REQUEST, "REQUEST_INVALID", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use relayq_core::error::{AppError, ErrorKind};

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Always `"error"`.
    pub status: String,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable error code.
    pub error: String,
}

/// HTTP-facing wrapper around [`AppError`].
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::validation(format!(
            "Invalid JSON body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, error_code) = match err.kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::StoreUnavailable => {
                tracing::error!(error = %err, "Job store unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_UNAVAILABLE")
            }
            ErrorKind::Serialization | ErrorKind::Configuration | ErrorKind::Internal => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        // Server-side detail stays in the log unless the kind is meant for callers.
        let message = if status.is_server_error() && !err.kind.is_user_visible() {
            "Internal server error".to_string()
        } else {
            err.message
        };

        let body = ApiErrorResponse {
            status: "error".to_string(),
            message,
            error: error_code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

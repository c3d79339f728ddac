//! Maps `MemoryError::kind()` to an HTTP status code. No business logic.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use memory_core::{ErrorKind, MemoryError};

use crate::dto::ErrorBody;

/// Wraps a [`MemoryError`] so it can be returned directly from a handler.
pub struct ApiError(pub MemoryError);

impl From<MemoryError> for ApiError {
    fn from(e: MemoryError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Transient | ErrorKind::Corrupt => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::OutOfWindow => StatusCode::CONFLICT,
        };
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

/// Shorthand for a plain `(status, message)` error, for validation failures
/// that never reach a `MemoryError`.
pub fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message.into() })).into_response()
}

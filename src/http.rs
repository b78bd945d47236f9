use axum::http::StatusCode;
use tracing::error;

/// Handlers answer errors as a status plus a plain message.
pub type ApiError = (StatusCode, String);

pub fn internal(e: impl std::fmt::Display) -> ApiError {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
}

pub fn bad_request(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

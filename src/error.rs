//! Shared error plumbing for HTTP responses.
//!
//! DESIGN
//! ======
//! Services own their `thiserror` enums; routes pick an HTTP status for each
//! variant and wrap the error in `ApiError`, which renders a stable
//! `{"error": code, "message": text}` body. Internal failures are logged
//! here and their message is replaced so SQL details never leak to clients.

use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Stable machine-readable code for an error, surfaced to clients.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

impl ErrorCode for sqlx::Error {
    fn error_code(&self) -> &'static str {
        "E_DATABASE"
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    /// Wrap a service error with the status the route chose for it.
    pub fn from_service<E>(status: StatusCode, err: &E) -> Self
    where
        E: ErrorCode + Display,
    {
        if status.is_server_error() {
            tracing::error!(error = %err, code = err.error_code(), "request failed");
            return Self::new(status, err.error_code(), "internal error");
        }
        Self::new(status, err.error_code(), err.to_string())
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "E_BAD_REQUEST", message)
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "E_UNAUTHORIZED", "authentication required")
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "E_FORBIDDEN", "insufficient permissions")
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "E_NOT_FOUND", message)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::from_service(StatusCode::INTERNAL_SERVER_ERROR, &err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.code, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

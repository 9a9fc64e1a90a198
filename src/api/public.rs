//! Public API types

use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::chat::ExchangeError;

// Errors

pub struct ApiError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ApiError {
    pub fn with_status(status: StatusCode, error: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }

    pub fn not_found(message: String) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!(message))
    }
}

/// Refusals are the client's fault, not ours
impl From<ExchangeError> for ApiError {
    fn from(err: ExchangeError) -> Self {
        let status = match err {
            ExchangeError::EmptyMessage => StatusCode::BAD_REQUEST,
            ExchangeError::Busy => StatusCode::CONFLICT,
        };
        Self::with_status(status, err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err)
    }
}

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.error);
            return (
                self.status,
                format!("Something went wrong: {}", self.error),
            )
                .into_response();
        }

        tracing::warn!(status = %self.status, "{}", self.error);
        (self.status, self.error.to_string()).into_response()
    }
}

// Re-export public types from each route

pub mod chat {
    pub use crate::api::routes::chat::public::*;
}

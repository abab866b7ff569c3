//! Agora API error types.

use agora_core::error::DomainError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Wiring the store, publisher or bus failed.
    #[error("startup error: {0}")]
    Domain(#[from] DomainError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// A domain or infrastructure failure.
    Domain(DomainError),
    /// The caller is not allowed to perform the action.
    Forbidden(String),
    /// The request carries no usable `user-id` header.
    Unauthorized,
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            Self::Domain(err) => {
                let (status, code) = match &err {
                    DomainError::AggregateNotFound(_) => {
                        (StatusCode::NOT_FOUND, "aggregate_not_found")
                    }
                    DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                    DomainError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
                    DomainError::Configuration(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
                    }
                };
                (status, code, err.to_string())
            }
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, "forbidden", message),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing user-id header".to_owned(),
            ),
        };

        (status, Json(ErrorBody { error, message })).into_response()
    }
}

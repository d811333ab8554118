//! Application error types.
//!
//! Every handler returns [`AppResult`]; the error is rendered as
//! `{"detail": "<message>"}` with the status code from [`AppError::status_code`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use validator::ValidationErrors;

use crate::response::ErrorResponse;

/// Result alias used throughout the service.
pub type AppResult<T> = Result<T, AppError>;

/// Broad classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The backend could not be reached.
    ServiceUnavailable,
    /// The backend was reached but the statement or command failed.
    OperationFailed,
    /// The request was rejected before touching any backend.
    InvalidInput,
}

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// PostgreSQL could not be reached.
    #[error("PG connection failed: {0}")]
    DatabaseConnection(String),

    /// A PostgreSQL statement failed.
    #[error("{0}")]
    DatabaseQuery(String),

    /// Redis could not be reached.
    #[error("Redis connection failed: {0}")]
    RedisConnection(String),

    /// A Redis command failed.
    #[error("{0}")]
    RedisOperation(String),

    /// Request parameters were rejected.
    #[error("{0}")]
    Validation(String),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AppError {
    /// Returns the error class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::DatabaseConnection(_) | AppError::RedisConnection(_) => {
                ErrorKind::ServiceUnavailable
            }
            AppError::Validation(_) => ErrorKind::InvalidInput,
            AppError::DatabaseQuery(_) | AppError::RedisOperation(_) | AppError::Config(_) => {
                ErrorKind::OperationFailed
            }
        }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// Backend faults of either class surface as 500.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::ServiceUnavailable | ErrorKind::OperationFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        if status.is_server_error() {
            tracing::error!(kind = ?self.kind(), error = %detail, "request failed");
        } else {
            tracing::warn!(error = %detail, "request rejected");
        }

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| errors.to_string());
        AppError::Validation(message)
    }
}

/// Error types for the geo feed service
///
/// Component errors (codecs, stores) convert into [`AppError`], which maps to
/// an HTTP status and a JSON body `{"error": ..., "status": ...}`.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;
use tracing::{error, warn};

use crate::codec::{CursorError, GeometryError};
use crate::db::StoreError;

/// Result type for geo-feed-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or out-of-range request parameters
    #[error("Validation error: {0}")]
    Validation(String),

    /// Cursor that `codec::cursor::encode` did not produce
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    /// Store returned a geometry we cannot read
    #[error("Geometry error: {0}")]
    GeometryFormat(#[from] GeometryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message returned to clients. Server-side failures stay generic.
    fn public_message(&self) -> String {
        match self {
            Self::Validation(_) | Self::InvalidCursor(_) => self.to_string(),
            Self::GeometryFormat(_) => "Stored content could not be decoded".to_string(),
            Self::Store(StoreError::Timeout(_)) => "Feed store timed out".to_string(),
            Self::Store(_) => "Feed store unavailable".to_string(),
            Self::Internal(_) => "Internal error".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidCursor(_) => StatusCode::BAD_REQUEST,
            AppError::GeometryFormat(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(StoreError::Database(err))
    }
}

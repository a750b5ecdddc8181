//! Application-wide error types and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use solidarity_protocol::ProtocolError;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::Envelope;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A business rule refused the operation.
    #[error(transparent)]
    Domain(#[from] ProtocolError),

    /// The bearer credential is missing, invalid, or names no user.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Domain(err) => match err {
                ProtocolError::Validation(_) => StatusCode::BAD_REQUEST,
                ProtocolError::Permission(_) => StatusCode::FORBIDDEN,
                ProtocolError::NotFound(_) => StatusCode::NOT_FOUND,
                ProtocolError::StateConflict(_) | ProtocolError::Conflict(_) => {
                    StatusCode::CONFLICT
                }
                ProtocolError::AdmissionLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            },
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Migrate(_) | Self::Token(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Domain and authentication failures are reported to the caller verbatim;
/// infrastructure failures are logged and replaced by a generic message.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            debug!(status = status.as_u16(), error = %self, "request refused");
            self.to_string()
        };
        (status, Json(Envelope::<()>::failure(message))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

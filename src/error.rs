/// Unified error types for the points ledger service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Credential mismatch or invalid session token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Malformed request or configuration
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced account does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Business-rule rejection (duplicate sign-up, self transfer, insufficient points)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Password hashing errors
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Application-level status code carried in the reply body
    pub fn status(&self) -> StatusCode {
        match self {
            LedgerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            LedgerError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            LedgerError::Database(_)
            | LedgerError::Migration(_)
            | LedgerError::PasswordHash(_)
            | LedgerError::Jwt(_)
            | LedgerError::Io(_)
            | LedgerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the caller
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Authentication(msg)
            | LedgerError::Validation(msg)
            | LedgerError::NotFound(msg)
            | LedgerError::Conflict(msg) => msg.clone(),
            LedgerError::RateLimitExceeded { .. } => "rate limit exceeded".to_string(),
            // Don't leak details
            _ => "internal server error".to_string(),
        }
    }

    /// Whether this error is a server fault rather than a rejected request
    pub fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Error reply format shared by every procedure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorReply {
    pub status: u16,
    pub error: String,
}

/// Convert LedgerError to HTTP response
impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if self.is_internal() {
            tracing::error!(error = %self, "request failed");
        }

        let mut response = (
            status,
            Json(ErrorReply {
                status: status.as_u16(),
                error: self.client_message(),
            }),
        )
            .into_response();

        if let LedgerError::RateLimitExceeded { retry_after } = self {
            if let Ok(value) = retry_after.as_secs().max(1).to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

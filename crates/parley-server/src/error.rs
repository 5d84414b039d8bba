//! Error taxonomy shared by the token authority, message store and dispatcher.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use parley_core::db::DatabaseError;
use parley_crypto::CryptoError;

/// Convenience alias for fallible core operations.
pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Malformed, forged, expired, wrong-kind or unknown token, or a failed
    /// login. The cause is never surfaced to the caller.
    #[error("Invalid credentials")]
    InvalidCredential,

    /// Authenticated, but not allowed to touch this resource.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Missing signing key or similar; fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ChatError {
    /// Stable machine-readable code, used in HTTP bodies and websocket
    /// error notifications.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredential => "invalid_credential",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::UserNotFound(_) => "user_not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation_error",
            Self::Persistence(_) => "persistence_error",
            Self::Configuration(_) => "configuration_error",
            Self::ProtocolViolation(_) => "protocol_violation",
            Self::Crypto(_) => "crypto_error",
        }
    }

    /// Message safe to hand to a client. Storage and config internals stay
    /// in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Persistence(_) | Self::Configuration(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::UserNotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) | Self::ProtocolViolation(_) | Self::Crypto(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Persistence(_) | Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DatabaseError> for ChatError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            DatabaseError::Constraint(what) => Self::Conflict(what),
            other => Self::Persistence(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Persistence(_) | Self::Configuration(_)) {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            error: self.code(),
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_share_one_message() {
        assert_eq!(ChatError::InvalidCredential.to_string(), "Invalid credentials");
        assert_eq!(
            ChatError::InvalidCredential.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn storage_details_are_not_public() {
        let err = ChatError::from(DatabaseError::Query("disk I/O error at page 7".into()));
        assert_eq!(err.code(), "persistence_error");
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn database_not_found_maps_to_not_found() {
        let err = ChatError::from(DatabaseError::NotFound("Message 4".into()));
        assert!(matches!(err, ChatError::NotFound(_)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err = ChatError::from(DatabaseError::Constraint("users.email".into()));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}

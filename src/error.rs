//! Authentication Error Types
//!
//! Centralized error handling for all authentication operations.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::errors::ErrorKind;

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Email delivery failed: {0}")]
    Delivery(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error")]
    Internal,
}

impl AuthError {
    /// HTTP status and machine-readable code for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::DuplicateEmail => (StatusCode::BAD_REQUEST, "duplicate_email"),
            AuthError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AuthError::ExpiredToken => (StatusCode::UNAUTHORIZED, "expired_token"),
            AuthError::PasswordMismatch => (StatusCode::BAD_REQUEST, "password_mismatch"),
            AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AuthError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            AuthError::Delivery(_) => (StatusCode::INTERNAL_SERVER_ERROR, "delivery_error"),
            AuthError::Database(_) | AuthError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();

        let detail = match &self {
            AuthError::Database(_) | AuthError::Internal => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "detail": detail
            })),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AuthError::DuplicateEmail;
            }
        }
        tracing::error!("Database error: {:?}", err);
        AuthError::Database(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT error: {:?}", err);
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        AuthError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::DuplicateEmail.status().0, StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::UserNotFound.status().0, StatusCode::NOT_FOUND);
        assert_eq!(AuthError::InvalidCredentials.status().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::ExpiredToken.status().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::PasswordMismatch.status().0, StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::Delivery("smtp down".into()).status().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_expired_jwt_maps_to_expired_token() {
        let err = jsonwebtoken::errors::Error::from(ErrorKind::ExpiredSignature);
        assert!(matches!(AuthError::from(err), AuthError::ExpiredToken));

        let err = jsonwebtoken::errors::Error::from(ErrorKind::InvalidSignature);
        assert!(matches!(AuthError::from(err), AuthError::InvalidToken));
    }

    #[test]
    fn test_database_detail_is_not_leaked() {
        let response = AuthError::Database("relation users does not exist".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

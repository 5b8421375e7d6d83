//! Unified error handling.
//!
//! Provides a unified `AppError` type with a stable status taxonomy. All
//! route handlers return `Result<T, AppError>`; service errors convert into
//! it losslessly so the HTTP layer never re-classifies by hand. Responses use
//! the `{success, message}` JSON envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::orders::OrderError;
use crate::services::ownership::Forbidden;
use crate::services::tokens::TokenError;
use crate::store::StoreError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, invalid, or expired credential.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Valid credential, wrong owner or role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate unique field.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid input, insufficient stock, order not cancellable, etc.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("too many requests")]
    RateLimited,

    /// Internal server error. Detail is logged, never exposed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = %self, "request error");
        }

        let status = match &self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_owned(),
            Self::Unauthenticated(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited => "Too many requests".to_owned(),
        };

        let body = json!({ "success": false, "message": message });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("resource not found".to_owned()),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Database(_) | StoreError::Corruption(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::Unauthenticated("token expired".to_owned()),
            TokenError::Malformed | TokenError::Invalid => {
                Self::Unauthenticated("invalid token".to_owned())
            }
            TokenError::InvalidRefresh => {
                Self::Unauthenticated("invalid or expired refresh token".to_owned())
            }
            TokenError::Store(e) => e.into(),
        }
    }
}

impl From<Forbidden> for AppError {
    fn from(err: Forbidden) -> Self {
        Self::Forbidden(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => {
                Self::BadRequest(err.to_string())
            }
            AuthError::InvalidCredentials => Self::Unauthenticated(err.to_string()),
            AuthError::AccountDisabled => Self::Forbidden(err.to_string()),
            AuthError::AlreadyExists => Self::Conflict(err.to_string()),
            AuthError::NotFound => Self::NotFound(err.to_string()),
            AuthError::PasswordHash => Self::Internal(err.to_string()),
            AuthError::Token(e) => e.into(),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => Self::NotFound(err.to_string()),
            CatalogError::Forbidden(e) => e.into(),
            CatalogError::Store(e) => e.into(),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::ItemNotFound | OrderError::NotFound => Self::NotFound(err.to_string()),
            OrderError::ZeroQuantity
            | OrderError::InsufficientStock { .. }
            | OrderError::InvalidTransition { .. }
            | OrderError::InFlight(_) => Self::BadRequest(err.to_string()),
            OrderError::Forbidden(e) => e.into(),
            OrderError::Store(e) => e.into(),
        }
    }
}

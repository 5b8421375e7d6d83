//! Authentication extractors.
//!
//! Handlers declare their auth requirement in their signature:
//!
//! - [`RequireAuth`] rejects with 401 unless a valid bearer token is present.
//! - [`RequireAdmin`] additionally requires the admin role (403 otherwise).
//! - [`OptionalAuth`] never rejects: verification failures are swallowed and
//!   the handler proceeds without an identity. Only read-oriented handlers
//!   that work anonymously use this.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use ladle_core::Role;

use crate::error::AppError;
use crate::services::tokens::{AccessClaims, TokenError};
use crate::state::AppState;

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(claims): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", claims.email)
/// }
/// ```
pub struct RequireAuth(pub AccessClaims);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthenticated("no token provided".to_owned()))?;

        // Distinct messages per failure class; all of them are 401.
        let claims = state.tokens().verify_access(token).map_err(|e| match e {
            TokenError::Expired => AppError::Unauthenticated("token expired".to_owned()),
            TokenError::Malformed | TokenError::Invalid => {
                AppError::Unauthenticated("invalid token".to_owned())
            }
            _ => AppError::Unauthenticated("token verification failed".to_owned()),
        })?;

        Ok(Self(claims))
    }
}

/// Extractor that requires a valid access token with the admin role.
pub struct RequireAdmin(pub AccessClaims);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;

        if claims.role != Role::Admin {
            return Err(AppError::Forbidden(
                "admin role required".to_owned(),
            ));
        }

        Ok(Self(claims))
    }
}

/// Extractor that optionally gets the caller's identity.
///
/// Unlike `RequireAuth`, this does not reject the request: a missing,
/// malformed, or expired token yields `None` rather than a 401.
pub struct OptionalAuth(pub Option<AccessClaims>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_token(parts).and_then(|token| state.tokens().verify_access(token).ok());
        Ok(Self(claims))
    }
}

/// Pull the token out of an `Authorization: Bearer ...` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

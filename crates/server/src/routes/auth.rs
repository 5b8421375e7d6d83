//! Authentication route handlers.
//!
//! Registration, password and federated login, token refresh, logout, and
//! profile management. Successful logins return the access token in the body
//! and set the refresh token as an HTTP-only cookie.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{ProfileUpdate, PublicUser};
use crate::response::ApiResponse;
use crate::services::auth::{FederatedLogin, Registration};
use crate::state::AppState;

/// Name of the HTTP-only refresh token cookie.
const REFRESH_COOKIE: &str = "ladle_refresh";

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct FederatedRequest {
    pub federated_id: String,
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

/// Login/registration payload: the account plus a fresh access token.
#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: PublicUser,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenData {
    pub access_token: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/v1/auth/register`
pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_owned()));
    }

    let outcome = state
        .auth()
        .register(Registration {
            email: request.email,
            password: request.password,
            name: request.name,
            photo_url: request.photo_url,
        })
        .await?;

    set_refresh_cookie(&cookies, &state, &outcome.tokens.refresh);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AuthData {
            user: outcome.identity.public(),
            access_token: outcome.tokens.access,
        })),
    ))
}

/// `POST /api/v1/auth/login`
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthData>>> {
    let outcome = state.auth().login(&request.email, &request.password).await?;

    set_refresh_cookie(&cookies, &state, &outcome.tokens.refresh);

    Ok(Json(ApiResponse::ok(AuthData {
        user: outcome.identity.public(),
        access_token: outcome.tokens.access,
    })))
}

/// `POST /api/v1/auth/federated`
///
/// Creates the account on first use, links the federated id to an existing
/// email account otherwise.
pub async fn federated(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(request): Json<FederatedRequest>,
) -> Result<Json<ApiResponse<AuthData>>> {
    if request.federated_id.trim().is_empty() {
        return Err(AppError::BadRequest("federated_id is required".to_owned()));
    }

    let outcome = state
        .auth()
        .federated_login(FederatedLogin {
            federated_id: request.federated_id,
            email: request.email,
            name: request.name,
            photo_url: request.photo_url,
        })
        .await?;

    set_refresh_cookie(&cookies, &state, &outcome.tokens.refresh);

    Ok(Json(ApiResponse::ok(AuthData {
        user: outcome.identity.public(),
        access_token: outcome.tokens.access,
    })))
}

/// `POST /api/v1/auth/refresh`
///
/// The refresh token comes from the cookie, or from the body for clients
/// that don't hold cookies. The body is read as raw bytes because it is
/// legitimately absent in the cookie case.
pub async fn refresh(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Bytes,
) -> Result<Json<ApiResponse<AccessTokenData>>> {
    let body_token = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .ok()
            .and_then(|r| r.refresh_token)
    };

    let token = cookies
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_owned())
        .or(body_token)
        .ok_or_else(|| AppError::Unauthenticated("no refresh token provided".to_owned()))?;

    let access_token = state.auth().refresh(&token).await?;

    Ok(Json(ApiResponse::ok(AccessTokenData { access_token })))
}

/// `POST /api/v1/auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<ApiResponse<()>>> {
    state.auth().logout(claims.sub).await?;
    clear_refresh_cookie(&cookies);

    Ok(Json(ApiResponse::message("Logged out successfully")))
}

/// `GET /api/v1/auth/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<ApiResponse<PublicUser>>> {
    let identity = state.auth().profile(claims.sub).await?;
    Ok(Json(ApiResponse::ok(identity.public())))
}

/// `PATCH /api/v1/auth/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<PublicUser>>> {
    if let Some(name) = &request.name
        && name.trim().is_empty()
    {
        return Err(AppError::BadRequest("name cannot be empty".to_owned()));
    }

    let identity = state
        .auth()
        .update_profile(
            claims.sub,
            ProfileUpdate {
                name: request.name,
                photo_url: request.photo_url,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(identity.public())))
}

// =============================================================================
// Cookie helpers
// =============================================================================

fn set_refresh_cookie(cookies: &Cookies, state: &AppState, refresh_token: &str) {
    let max_age =
        tower_cookies::cookie::time::Duration::seconds(state.tokens().refresh_ttl().num_seconds());
    let cookie = Cookie::build((REFRESH_COOKIE, refresh_token.to_owned()))
        .path("/")
        .http_only(true)
        .max_age(max_age)
        .build();
    cookies.add(cookie);
}

fn clear_refresh_cookie(cookies: &Cookies) {
    let cookie = Cookie::build((REFRESH_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}

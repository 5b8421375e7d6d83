//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//!
//! # Auth
//! POST  /api/v1/auth/register         - Create account, returns tokens
//! POST  /api/v1/auth/login            - Password login
//! POST  /api/v1/auth/federated        - Federated login (creates on first use)
//! POST  /api/v1/auth/refresh          - Exchange refresh token for access token
//! POST  /api/v1/auth/logout           - Invalidate refresh token (requires auth)
//! GET   /api/v1/auth/profile          - Current account (requires auth)
//! PATCH /api/v1/auth/profile          - Update profile (requires auth)
//!
//! # Items
//! GET    /api/v1/items                - Public listing (search/filter/pagination)
//! GET    /api/v1/items/top            - Most purchased items
//! GET    /api/v1/items/mine           - Caller's items (requires auth)
//! GET    /api/v1/items/{id}           - Item detail
//! POST   /api/v1/items                - Create item (requires auth)
//! PATCH  /api/v1/items/{id}           - Update item (owner only)
//! DELETE /api/v1/items/{id}           - Delete item (owner only)
//!
//! # Orders (all require auth)
//! POST   /api/v1/orders               - Place order
//! GET    /api/v1/orders/mine          - Caller's orders
//! GET    /api/v1/orders/{id}          - Order detail (buyer only)
//! PATCH  /api/v1/orders/{id}/status   - Drive status state machine (buyer only)
//! DELETE /api/v1/orders/{id}          - Delete pending/confirmed order (buyer only)
//! GET    /api/v1/orders/admin/all     - All orders (admin role only)
//! ```

pub mod auth;
pub mod items;
pub mod orders;

use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_cookies::CookieManagerLayer;

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/federated", post(auth::federated))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route(
            "/profile",
            get(auth::get_profile).patch(auth::update_profile),
        )
}

/// Create the item routes router.
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(items::list).post(items::create))
        .route("/top", get(items::top))
        .route("/mine", get(items::mine))
        .route(
            "/{id}",
            get(items::get).patch(items::update).delete(items::delete),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/mine", get(orders::mine))
        .route("/admin/all", get(orders::admin_all))
        .route("/{id}", get(orders::get).delete(orders::delete))
        .route("/{id}/status", patch(orders::update_status))
}

/// Create all routes for the server.
///
/// Limit-free; tests drive this router directly. The binary uses
/// [`rate_limited_router`], which adds the production rate-limit tiers.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/auth", auth_routes())
        .nest("/api/v1/items", item_routes())
        .nest("/api/v1/orders", order_routes())
        .layer(CookieManagerLayer::new())
}

/// Create all routes with the production rate-limit tiers applied: a strict
/// limiter on auth endpoints, a relaxed one everywhere else.
pub fn rate_limited_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest(
            "/api/v1/auth",
            auth_routes().layer(crate::middleware::auth_rate_limiter()),
        )
        .nest("/api/v1/items", item_routes())
        .nest("/api/v1/orders", order_routes())
        .layer(crate::middleware::api_rate_limiter())
        .layer(CookieManagerLayer::new())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

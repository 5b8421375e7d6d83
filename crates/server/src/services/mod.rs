//! Service layer.
//!
//! Each service is a thin, cheaply constructed facade over the store traits:
//! handlers build them per-request from [`crate::state::AppState`] accessors.

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod ownership;
pub mod tokens;

pub use auth::{AuthError, AuthService};
pub use catalog::{CatalogError, CatalogService};
pub use orders::{OrderError, OrderWorkflow};
pub use ownership::{Forbidden, Owned, ensure_owner};
pub use tokens::{AccessClaims, TokenAuthority, TokenError, TokenPair};

//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::AuthService;
use crate::services::catalog::CatalogService;
use crate::services::orders::OrderWorkflow;
use crate::services::tokens::TokenAuthority;
use crate::store::{CatalogStore, CredentialStore, OrderStore};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the store trait objects and the token
/// authority; services are constructed per-request from the accessors below.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    users: Arc<dyn CredentialStore>,
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    tokens: TokenAuthority,
}

impl AppState {
    /// Create a new application state over the given store backends.
    #[must_use]
    pub fn new(
        config: Config,
        users: Arc<dyn CredentialStore>,
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        let tokens = TokenAuthority::new(Arc::clone(&users), config.token_config());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                users,
                catalog,
                orders,
                tokens,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get a reference to the token authority.
    #[must_use]
    pub fn tokens(&self) -> &TokenAuthority {
        &self.inner.tokens
    }

    /// Build the account service.
    #[must_use]
    pub fn auth(&self) -> AuthService {
        AuthService::new(Arc::clone(&self.inner.users), self.inner.tokens.clone())
    }

    /// Build the catalog service.
    #[must_use]
    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(Arc::clone(&self.inner.catalog))
    }

    /// Build the order workflow.
    #[must_use]
    pub fn orders(&self) -> OrderWorkflow {
        OrderWorkflow::new(
            Arc::clone(&self.inner.catalog),
            Arc::clone(&self.inner.orders),
        )
    }
}

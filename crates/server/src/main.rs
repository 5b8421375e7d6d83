//! Ladle server - food ordering backend.
//!
//! # Architecture
//!
//! - Axum web framework serving a JSON API
//! - Bearer access tokens + HTTP-only refresh cookie for authentication
//! - `PostgreSQL` via sqlx when `LADLE_DATABASE_URL` is set; in-memory store
//!   otherwise (useful for local development, nothing is persisted)
//!
//! All multi-writer state is mutated through single-record atomic store
//! operations; there are no cross-aggregate transactions anywhere in the
//! request path.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ladle_server::config::Config;
use ladle_server::routes;
use ladle_server::state::AppState;
use ladle_server::store::{CatalogStore, CredentialStore, MemoryStore, OrderStore, PgStore, postgres};

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ladle_server=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Choose the store backend
    let (users, catalog, orders) = build_stores(&config).await;

    // Build application state and router
    let state = AppState::new(config.clone(), users, catalog, orders);

    let app = Router::new()
        .merge(routes::rate_limited_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.socket_addr();
    tracing::info!("ladle server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Open the configured store backend, running migrations for `PostgreSQL`.
async fn build_stores(
    config: &Config,
) -> (
    Arc<dyn CredentialStore>,
    Arc<dyn CatalogStore>,
    Arc<dyn OrderStore>,
) {
    match &config.database_url {
        Some(url) => {
            let pool = postgres::create_pool(url)
                .await
                .expect("Failed to create database pool");
            sqlx::migrate!()
                .run(&pool)
                .await
                .expect("Failed to run migrations");
            tracing::info!("Database pool created, migrations applied");

            let store = Arc::new(PgStore::new(pool));
            (store.clone(), store.clone(), store)
        }
        None => {
            tracing::warn!(
                "LADLE_DATABASE_URL not set; using in-memory store (data is not persisted)"
            );
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store.clone(), store)
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

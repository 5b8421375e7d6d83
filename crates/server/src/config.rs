//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LADLE_ACCESS_TOKEN_SECRET` - Access-token signing secret (min 32 chars)
//! - `LADLE_REFRESH_TOKEN_SECRET` - Refresh-token signing secret (min 32
//!   chars, must differ from the access secret)
//!
//! ## Optional
//! - `LADLE_DATABASE_URL` - `PostgreSQL` connection string. When unset the
//!   server runs on the in-memory store (nothing is persisted).
//! - `LADLE_HOST` - Bind address (default: 127.0.0.1)
//! - `LADLE_PORT` - Listen port (default: 5000)
//! - `LADLE_ACCESS_TOKEN_TTL_MINUTES` - Access token lifetime (default: 15)
//! - `LADLE_REFRESH_TOKEN_TTL_DAYS` - Refresh token lifetime (default: 7)

use std::net::{IpAddr, SocketAddr};

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::services::tokens::TokenConfig;

const MIN_SECRET_LENGTH: usize = 32;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// `PostgreSQL` connection URL; in-memory store when absent
    pub database_url: Option<SecretString>,
    /// Access-token signing secret
    pub access_token_secret: SecretString,
    /// Refresh-token signing secret
    pub refresh_token_secret: SecretString,
    /// Access token lifetime in minutes
    pub access_token_ttl_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_ttl_days: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if secrets fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("LADLE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("LADLE_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("LADLE_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("LADLE_PORT".to_owned(), e.to_string()))?;

        let database_url = get_optional_env("LADLE_DATABASE_URL").map(SecretString::from);

        let access_token_secret = get_validated_secret("LADLE_ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = get_validated_secret("LADLE_REFRESH_TOKEN_SECRET")?;
        if access_token_secret.expose_secret() == refresh_token_secret.expose_secret() {
            return Err(ConfigError::InsecureSecret(
                "LADLE_REFRESH_TOKEN_SECRET".to_owned(),
                "must differ from LADLE_ACCESS_TOKEN_SECRET".to_owned(),
            ));
        }

        let access_token_ttl_minutes = get_env_or_default("LADLE_ACCESS_TOKEN_TTL_MINUTES", "15")
            .parse::<i64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("LADLE_ACCESS_TOKEN_TTL_MINUTES".to_owned(), e.to_string())
            })?;
        let refresh_token_ttl_days = get_env_or_default("LADLE_REFRESH_TOKEN_TTL_DAYS", "7")
            .parse::<i64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("LADLE_REFRESH_TOKEN_TTL_DAYS".to_owned(), e.to_string())
            })?;

        Ok(Self {
            host,
            port,
            database_url,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_minutes,
            refresh_token_ttl_days,
        })
    }

    /// The socket address to bind to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Signing configuration for the token authority.
    #[must_use]
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            access_secret: self.access_token_secret.clone(),
            refresh_secret: self.refresh_token_secret.clone(),
            access_ttl: Duration::minutes(self.access_token_ttl_minutes),
            refresh_ttl: Duration::days(self.refresh_token_ttl_days),
        }
    }
}

fn get_optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_env_or_default(name: &str, default: &str) -> String {
    get_optional_env(name).unwrap_or_else(|| default.to_owned())
}

fn get_required_env(name: &str) -> Result<String, ConfigError> {
    get_optional_env(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_owned()))
}

fn get_validated_secret(name: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(name)?;
    if value.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            name.to_owned(),
            format!("must be at least {MIN_SECRET_LENGTH} characters"),
        ));
    }
    Ok(SecretString::from(value))
}

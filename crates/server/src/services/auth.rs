//! Account service.
//!
//! Registration, password and federated login, token refresh, logout, and
//! profile management. Password hashing uses Argon2id.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;

use ladle_core::{AuthProvider, EmailAddress, Role, UserId};

use crate::models::{Identity, ProfileUpdate};
use crate::services::tokens::{TokenAuthority, TokenError, TokenPair};
use crate::store::{CredentialStore, StoreError};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Errors that can occur during account operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] ladle_core::EmailError),

    /// Wrong password or unknown email. Deliberately indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Valid credentials, deactivated account.
    #[error("account has been deactivated")]
    AccountDisabled,

    /// Email (or federated id) already registered.
    #[error("an account with this email already exists")]
    AlreadyExists,

    /// Password too weak.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Account not found.
    #[error("account not found")]
    NotFound,

    /// Password hashing failed.
    #[error("password hashing error")]
    PasswordHash,

    /// Token operation failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A successful authentication: the account plus a fresh token pair.
#[derive(Debug)]
pub struct AuthOutcome {
    pub identity: Identity,
    pub tokens: TokenPair,
}

/// New registration input (already shape-validated by the HTTP layer).
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub photo_url: Option<String>,
}

/// Federated login input.
#[derive(Debug)]
pub struct FederatedLogin {
    pub federated_id: String,
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

/// Account service.
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    tokens: TokenAuthority,
}

impl AuthService {
    #[must_use]
    pub fn new(users: Arc<dyn CredentialStore>, tokens: TokenAuthority) -> Self {
        Self { users, tokens }
    }

    /// Register a new account with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::AlreadyExists` if the email is already registered.
    pub async fn register(&self, registration: Registration) -> Result<AuthOutcome, AuthError> {
        let email = EmailAddress::parse(&registration.email)?;
        validate_password(&registration.password)?;
        let password_hash = hash_password(&registration.password)?;

        let now = Utc::now();
        let identity = self
            .users
            .insert_identity(Identity {
                id: UserId::new(),
                email,
                name: registration.name,
                photo_url: registration.photo_url,
                password_hash: Some(password_hash),
                federated_id: None,
                provider: AuthProvider::Password,
                role: Role::User,
                active: true,
                refresh_fingerprint: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::AlreadyExists,
                other => AuthError::Store(other),
            })?;

        let tokens = self.tokens.issue_pair(&identity).await?;
        Ok(AuthOutcome { identity, tokens })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::AccountDisabled` for deactivated accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, AuthError> {
        let email = EmailAddress::parse(email)?;

        let identity = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !identity.active {
            return Err(AuthError::AccountDisabled);
        }

        let hash = identity
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)?;

        let tokens = self.tokens.issue_pair(&identity).await?;
        Ok(AuthOutcome { identity, tokens })
    }

    /// Login (or first-login-create) via an external identity provider.
    ///
    /// Lookup order: by federated id, then by email (linking the federated id
    /// to the existing account rather than duplicating it), then create.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::AccountDisabled` for deactivated accounts.
    pub async fn federated_login(&self, login: FederatedLogin) -> Result<AuthOutcome, AuthError> {
        let email = EmailAddress::parse(&login.email)?;

        let identity = match self.users.find_by_federated_id(&login.federated_id).await? {
            Some(existing) => existing,
            None => match self.users.find_by_email(&email).await? {
                Some(existing) => {
                    self.users
                        .link_federated_id(existing.id, &login.federated_id)
                        .await?
                }
                None => {
                    // First federated login: the display name falls back to
                    // the email's local part.
                    let name = login
                        .name
                        .unwrap_or_else(|| email.as_str().split('@').next().unwrap_or("").to_owned());
                    let now = Utc::now();
                    self.users
                        .insert_identity(Identity {
                            id: UserId::new(),
                            email,
                            name,
                            photo_url: login.photo_url,
                            password_hash: None,
                            federated_id: Some(login.federated_id),
                            provider: AuthProvider::Federated,
                            role: Role::User,
                            active: true,
                            refresh_fingerprint: None,
                            created_at: now,
                            updated_at: now,
                        })
                        .await?
                }
            },
        };

        if !identity.active {
            return Err(AuthError::AccountDisabled);
        }

        let tokens = self.tokens.issue_pair(&identity).await?;
        Ok(AuthOutcome { identity, tokens })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` wrapping `InvalidRefresh` on any failure.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        Ok(self.tokens.rotate(refresh_token).await?)
    }

    /// Logout: invalidate the account's refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if clearing the fingerprint fails.
    pub async fn logout(&self, id: UserId) -> Result<(), AuthError> {
        self.tokens.revoke(id).await?;
        Ok(())
    }

    /// Load an account's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the account doesn't exist.
    pub async fn profile(&self, id: UserId) -> Result<Identity, AuthError> {
        self.users.find_by_id(id).await?.ok_or(AuthError::NotFound)
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the account doesn't exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Identity, AuthError> {
        self.users
            .update_profile(id, update)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::NotFound,
                other => AuthError::Store(other),
            })
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

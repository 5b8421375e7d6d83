//! Token issuing, verification, and rotation.
//!
//! Two token families signed with distinct secrets:
//!
//! - **Access tokens** carry identity claims and live minutes. They are
//!   verified statelessly; revocation does not reach tokens already issued
//!   (they age out at their natural expiry - a stated limitation).
//! - **Refresh tokens** live days and are exchanged for new access tokens.
//!   Only the SHA-256 fingerprint of the most recently issued refresh token
//!   is stored against the account, so exactly one refresh token is valid
//!   per account at any time: issuing a new pair invalidates the previous
//!   refresh token even though its signature still checks out.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ladle_core::{Role, UserId};

use crate::models::Identity;
use crate::store::{CredentialStore, StoreError};

/// Errors from token operations.
///
/// Verification failures are classified so callers can phrase distinct
/// user-facing messages, but access-control-wise they are all the same:
/// unauthenticated.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token's expiry has passed.
    #[error("token expired")]
    Expired,

    /// The token is not structurally a JWT we can read.
    #[error("malformed token")]
    Malformed,

    /// Structurally fine but cryptographically or semantically wrong.
    #[error("invalid token")]
    Invalid,

    /// Refresh token rejected: bad signature, expired, revoked, or rotated
    /// away by a newer issue.
    #[error("invalid or expired refresh token")]
    InvalidRefresh,

    /// Store failure while loading or updating the account.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account ID.
    pub sub: UserId,
    /// Account email (lowercased).
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token.
///
/// `jti` makes every issued refresh token unique, so two pairs issued within
/// the same second still have distinct fingerprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RefreshClaims {
    sub: UserId,
    jti: Uuid,
    iat: i64,
    exp: i64,
}

/// An access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signing configuration for the token authority.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Issues, verifies, and rotates token pairs.
#[derive(Clone)]
pub struct TokenAuthority {
    users: Arc<dyn CredentialStore>,
    config: TokenConfig,
}

impl TokenAuthority {
    #[must_use]
    pub fn new(users: Arc<dyn CredentialStore>, config: TokenConfig) -> Self {
        Self { users, config }
    }

    /// Issue a fresh access/refresh pair for an account.
    ///
    /// Side effect: overwrites the account's stored refresh fingerprint.
    /// This is the rotation point - any refresh token issued earlier for this
    /// account stops working the moment this write lands.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Store` if persisting the fingerprint fails.
    pub async fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
        let now = Utc::now();

        let access_claims = AccessClaims {
            sub: identity.id,
            email: identity.email.as_str().to_owned(),
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + self.config.access_ttl).timestamp(),
        };
        let refresh_claims = RefreshClaims {
            sub: identity.id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + self.config.refresh_ttl).timestamp(),
        };

        let access = sign(&access_claims, &self.config.access_secret)?;
        let refresh = sign(&refresh_claims, &self.config.refresh_secret)?;

        self.users
            .set_refresh_fingerprint(identity.id, Some(fingerprint(&refresh)))
            .await?;

        Ok(TokenPair { access, refresh })
    }

    /// Verify an access token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `Expired`, `Malformed`, or `Invalid` depending on how
    /// verification failed; all three mean "unauthenticated" to callers.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let key = DecodingKey::from_secret(self.config.access_secret.expose_secret().as_bytes());
        decode::<AccessClaims>(token, &key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Malformed,
                _ => TokenError::Invalid,
            })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The presented token must verify against the refresh secret *and*
    /// fingerprint-match the one currently stored for the account: a token
    /// that was rotated away by a later login, or cleared by logout, is
    /// rejected even though its signature is still valid. The refresh token
    /// itself is not rotated here.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidRefresh` on any verification failure.
    pub async fn rotate(&self, refresh_token: &str) -> Result<String, TokenError> {
        let key = DecodingKey::from_secret(self.config.refresh_secret.expose_secret().as_bytes());
        let claims = decode::<RefreshClaims>(refresh_token, &key, &Validation::default())
            .map_err(|_| TokenError::InvalidRefresh)?
            .claims;

        let identity = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(TokenError::InvalidRefresh)?;

        let presented = fingerprint(refresh_token);
        match &identity.refresh_fingerprint {
            Some(stored) if *stored == presented => {}
            _ => return Err(TokenError::InvalidRefresh),
        }

        let now = Utc::now();
        let access_claims = AccessClaims {
            sub: identity.id,
            email: identity.email.as_str().to_owned(),
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + self.config.access_ttl).timestamp(),
        };
        sign(&access_claims, &self.config.access_secret)
    }

    /// Invalidate the account's refresh token.
    ///
    /// Future `rotate` calls fail immediately. Access tokens already issued
    /// keep working until they expire.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Store` if clearing the fingerprint fails.
    pub async fn revoke(&self, id: UserId) -> Result<(), TokenError> {
        self.users.set_refresh_fingerprint(id, None).await?;
        Ok(())
    }

    /// Refresh-token lifetime, for cookie expiry.
    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        self.config.refresh_ttl
    }
}

fn sign<T: Serialize>(claims: &T, secret: &SecretString) -> Result<String, TokenError> {
    let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
    encode(&Header::default(), claims, &key).map_err(|_| TokenError::Invalid)
}

/// SHA-256 hex digest of a token - what gets persisted instead of the token.
fn fingerprint(token: &str) -> String {
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ladle_core::{AuthProvider, EmailAddress, Role};

    use super::*;
    use crate::store::MemoryStore;

    fn test_config() -> TokenConfig {
        TokenConfig {
            access_secret: SecretString::from("access-test-secret-0123456789abcdef"),
            refresh_secret: SecretString::from("refresh-test-secret-0123456789abcdef"),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }

    fn identity(email: &str) -> Identity {
        let now = Utc::now();
        Identity {
            id: UserId::new(),
            email: EmailAddress::parse(email).expect("valid email"),
            name: "Test".to_owned(),
            photo_url: None,
            password_hash: None,
            federated_id: None,
            provider: AuthProvider::Password,
            role: Role::User,
            active: true,
            refresh_fingerprint: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn authority_with_user(email: &str) -> (TokenAuthority, Identity) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_identity(identity(email))
            .await
            .expect("insert");
        (TokenAuthority::new(store, test_config()), user)
    }

    #[tokio::test]
    async fn test_issue_then_verify_round_trips_claims() {
        let (authority, user) = authority_with_user("claims@x.com").await;

        let pair = authority.issue_pair(&user).await.expect("issue");
        let claims = authority.verify_access(&pair.access).expect("verify");

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "claims@x.com");
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn test_second_issue_invalidates_first_refresh() {
        let (authority, user) = authority_with_user("rotate@x.com").await;

        let first = authority.issue_pair(&user).await.expect("first issue");
        let second = authority.issue_pair(&user).await.expect("second issue");

        assert!(matches!(
            authority.rotate(&first.refresh).await,
            Err(TokenError::InvalidRefresh)
        ));
        assert!(authority.rotate(&second.refresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_rotate_returns_fresh_access_for_same_identity() {
        let (authority, user) = authority_with_user("fresh@x.com").await;

        let pair = authority.issue_pair(&user).await.expect("issue");
        let rotated = authority.rotate(&pair.refresh).await.expect("rotate");

        let claims = authority.verify_access(&rotated).expect("verify");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "fresh@x.com");
    }

    #[tokio::test]
    async fn test_rotate_does_not_rotate_refresh_itself() {
        let (authority, user) = authority_with_user("stable@x.com").await;

        let pair = authority.issue_pair(&user).await.expect("issue");
        authority.rotate(&pair.refresh).await.expect("first rotate");
        // Same refresh token still works: rotate mints access only.
        authority.rotate(&pair.refresh).await.expect("second rotate");
    }

    #[tokio::test]
    async fn test_revoke_blocks_rotation() {
        let (authority, user) = authority_with_user("revoke@x.com").await;

        let pair = authority.issue_pair(&user).await.expect("issue");
        authority.revoke(user.id).await.expect("revoke");

        assert!(matches!(
            authority.rotate(&pair.refresh).await,
            Err(TokenError::InvalidRefresh)
        ));
    }

    #[tokio::test]
    async fn test_access_token_survives_revocation_until_expiry() {
        let (authority, user) = authority_with_user("limitation@x.com").await;

        let pair = authority.issue_pair(&user).await.expect("issue");
        authority.revoke(user.id).await.expect("revoke");

        // Stated limitation: revocation is not retroactive for access tokens.
        assert!(authority.verify_access(&pair.access).is_ok());
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage_as_malformed() {
        let (authority, _) = authority_with_user("garbage@x.com").await;

        assert!(matches!(
            authority.verify_access("not-a-jwt"),
            Err(TokenError::Malformed)
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_secret_as_invalid() {
        let (authority, user) = authority_with_user("wrongkey@x.com").await;
        let other = TokenAuthority::new(
            Arc::new(MemoryStore::new()),
            TokenConfig {
                access_secret: SecretString::from("a-completely-different-access-secret"),
                ..test_config()
            },
        );

        let pair = authority.issue_pair(&user).await.expect("issue");
        assert!(matches!(
            other.verify_access(&pair.access),
            Err(TokenError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_expired_token() {
        let (authority, user) = authority_with_user("expired@x.com").await;

        let now = Utc::now();
        let stale = AccessClaims {
            sub: user.id,
            email: user.email.as_str().to_owned(),
            role: user.role,
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
        };
        let token = sign(&stale, &test_config().access_secret).expect("sign");

        assert!(matches!(
            authority.verify_access(&token),
            Err(TokenError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_a_valid_access_token() {
        let (authority, user) = authority_with_user("family@x.com").await;

        let pair = authority.issue_pair(&user).await.expect("issue");
        // Distinct secrets per token family: a refresh token presented as an
        // access token fails signature verification.
        assert!(authority.verify_access(&pair.refresh).is_err());
        assert!(matches!(
            authority.rotate(&pair.access).await,
            Err(TokenError::InvalidRefresh)
        ));
    }
}

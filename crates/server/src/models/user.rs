//! Account domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ladle_core::{AuthProvider, EmailAddress, Role, UserId};

/// A user account (domain type).
///
/// The record behind every credential: password hash for password accounts,
/// the federated-identity linkage for external logins, and the fingerprint of
/// the one currently valid refresh token. Accounts are deactivated, never
/// hard-deleted.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Unique account ID.
    pub id: UserId,
    /// Account email, unique and case-insensitive.
    pub email: EmailAddress,
    /// Display name.
    pub name: String,
    /// Avatar URL, if any.
    pub photo_url: Option<String>,
    /// Argon2 password hash. Absent for federated-only accounts.
    pub password_hash: Option<String>,
    /// External identity-provider subject, unique when present.
    pub federated_id: Option<String>,
    /// How the account was created.
    pub provider: AuthProvider,
    /// Account role.
    pub role: Role,
    /// Deactivated accounts cannot log in.
    pub active: bool,
    /// SHA-256 hex digest of the currently valid refresh token, if any.
    ///
    /// Overwritten on every login and refresh-pair issue, cleared on logout.
    /// A presented refresh token whose digest does not match this value is
    /// stale or reused and is rejected.
    pub refresh_fingerprint: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// The public projection returned to clients (no hashes, no fingerprint).
    #[must_use]
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            photo_url: self.photo_url.clone(),
            role: self.role,
            provider: self.provider,
        }
    }
}

/// Client-facing view of an account.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: UserId,
    pub email: EmailAddress,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub role: Role,
    pub provider: AuthProvider,
}

/// Partial profile update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

//! Resource ownership checks.
//!
//! Every owned resource type implements [`Owned`], and every mutating
//! operation on an owned resource runs the same [`ensure_owner`] predicate
//! before touching storage. The check is a pure equality between the
//! authenticated identity's email and the resource's recorded owner email;
//! both sides are lowercased at parse time so the comparison is
//! case-insensitive by construction.

use ladle_core::EmailAddress;

use crate::models::{CatalogItem, Order};

/// The caller does not own the resource.
#[derive(Debug, thiserror::Error)]
#[error("you do not have permission to access this resource")]
pub struct Forbidden;

/// A resource with a recorded owner.
pub trait Owned {
    /// The email of the identity that owns this resource.
    fn owner_email(&self) -> &EmailAddress;
}

impl Owned for CatalogItem {
    fn owner_email(&self) -> &EmailAddress {
        &self.owner_email
    }
}

impl Owned for Order {
    fn owner_email(&self) -> &EmailAddress {
        &self.buyer_email
    }
}

/// Require that `identity_email` owns `resource`.
///
/// # Errors
///
/// Returns [`Forbidden`] when the emails differ.
pub fn ensure_owner(identity_email: &str, resource: &impl Owned) -> Result<(), Forbidden> {
    if resource.owner_email().as_str() == identity_email {
        Ok(())
    } else {
        Err(Forbidden)
    }
}

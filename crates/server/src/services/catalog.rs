//! Catalog service.
//!
//! Listing, lookup, and owner-scoped mutation of menu items. The purchase
//! counter is not touched here - that write path belongs to the order
//! workflow.

use std::sync::Arc;

use chrono::Utc;

use ladle_core::{EmailAddress, ItemId, Price};

use crate::models::{CatalogItem, ItemPage, ItemQuery, ItemUpdate};
use crate::services::ownership::{Forbidden, ensure_owner};
use crate::services::tokens::AccessClaims;
use crate::store::{CatalogStore, StoreError};

/// Default page size for listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Hard cap on page size.
pub const MAX_PAGE_LIMIT: u32 = 100;
/// Default number of entries in the top-items listing.
pub const DEFAULT_TOP_LIMIT: u32 = 6;

/// Errors from catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Item not found.
    #[error("menu item not found")]
    NotFound,

    /// Caller does not own the item.
    #[error(transparent)]
    Forbidden(#[from] Forbidden),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Input for creating a new catalog item.
#[derive(Debug)]
pub struct NewItem {
    pub name: String,
    pub image_url: String,
    pub category: String,
    pub description: Option<String>,
    pub origin: Option<String>,
    pub price: Price,
    pub stock_quantity: u32,
}

/// Catalog service.
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Public listing with filters and pagination.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the query fails.
    pub async fn list(&self, mut query: ItemQuery) -> Result<ItemPage, CatalogError> {
        query.page = query.page.max(1);
        query.limit = query.limit.clamp(1, MAX_PAGE_LIMIT);
        Ok(self.catalog.list_items(&query).await?)
    }

    /// The most purchased items.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the query fails.
    pub async fn top(&self, limit: Option<u32>) -> Result<Vec<CatalogItem>, CatalogError> {
        let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        Ok(self.catalog.top_items(limit).await?)
    }

    /// Look up a single item.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the item doesn't exist.
    pub async fn get(&self, id: ItemId) -> Result<CatalogItem, CatalogError> {
        self.catalog
            .find_item(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Items owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the query fails.
    pub async fn mine(&self, owner: &EmailAddress) -> Result<Vec<CatalogItem>, CatalogError> {
        Ok(self.catalog.list_items_by_owner(owner).await?)
    }

    /// Create a new item owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the insert fails.
    pub async fn create(
        &self,
        claims: &AccessClaims,
        owner_name: Option<String>,
        new_item: NewItem,
    ) -> Result<CatalogItem, CatalogError> {
        let owner_email = EmailAddress::parse(&claims.email)
            .map_err(|e| StoreError::Corruption(format!("invalid email in claims: {e}")))?;

        let now = Utc::now();
        let item = CatalogItem {
            id: ItemId::new(),
            name: new_item.name,
            image_url: new_item.image_url,
            category: new_item.category,
            description: new_item.description,
            origin: new_item.origin,
            price: new_item.price,
            stock_quantity: new_item.stock_quantity,
            purchase_count: 0,
            owner_email,
            owner_name,
            created_at: now,
            updated_at: now,
        };

        Ok(self.catalog.insert_item(item).await?)
    }

    /// Owner-scoped update. The ownership check runs before any write.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the item doesn't exist.
    /// Returns `CatalogError::Forbidden` if the caller is not the owner.
    pub async fn update(
        &self,
        claims: &AccessClaims,
        id: ItemId,
        update: ItemUpdate,
    ) -> Result<CatalogItem, CatalogError> {
        let item = self.get(id).await?;
        ensure_owner(&claims.email, &item)?;

        self.catalog.update_item(id, update).await.map_err(|e| match e {
            StoreError::NotFound => CatalogError::NotFound,
            other => CatalogError::Store(other),
        })
    }

    /// Owner-scoped delete. The ownership check runs before any write.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the item doesn't exist.
    /// Returns `CatalogError::Forbidden` if the caller is not the owner.
    pub async fn delete(&self, claims: &AccessClaims, id: ItemId) -> Result<(), CatalogError> {
        let item = self.get(id).await?;
        ensure_owner(&claims.email, &item)?;

        self.catalog.delete_item(id).await.map_err(|e| match e {
            StoreError::NotFound => CatalogError::NotFound,
            other => CatalogError::Store(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use ladle_core::{Role, UserId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::store::MemoryStore;

    fn claims(email: &str) -> AccessClaims {
        AccessClaims {
            sub: UserId::new(),
            email: email.to_owned(),
            role: Role::User,
            iat: 0,
            exp: i64::MAX,
        }
    }

    fn new_item(name: &str) -> NewItem {
        NewItem {
            name: name.to_owned(),
            image_url: "https://img.example/x.png".to_owned(),
            category: "soup".to_owned(),
            description: None,
            origin: None,
            price: Price::new(Decimal::new(500, 2)).expect("price"),
            stock_quantity: 5,
        }
    }

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let catalog = service();
        let created = catalog
            .create(&claims("chef@x.com"), None, new_item("Gumbo"))
            .await
            .expect("create");

        let loaded = catalog.get(created.id).await.expect("get");
        assert_eq!(loaded.name, "Gumbo");
        assert_eq!(loaded.owner_email.as_str(), "chef@x.com");
        assert_eq!(loaded.purchase_count, 0);
    }

    #[tokio::test]
    async fn test_update_by_non_owner_forbidden() {
        let catalog = service();
        let created = catalog
            .create(&claims("chef@x.com"), None, new_item("Bisque"))
            .await
            .expect("create");

        let result = catalog
            .update(
                &claims("intruder@x.com"),
                created.id,
                ItemUpdate {
                    name: Some("Hijacked".to_owned()),
                    ..ItemUpdate::default()
                },
            )
            .await;

        assert!(matches!(result, Err(CatalogError::Forbidden(_))));

        // And nothing was written.
        let loaded = catalog.get(created.id).await.expect("get");
        assert_eq!(loaded.name, "Bisque");
    }

    #[tokio::test]
    async fn test_delete_by_owner_succeeds() {
        let catalog = service();
        let created = catalog
            .create(&claims("chef@x.com"), None, new_item("Stew"))
            .await
            .expect("create");

        catalog
            .delete(&claims("chef@x.com"), created.id)
            .await
            .expect("delete");

        assert!(matches!(
            catalog.get(created.id).await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_get_unknown_item_not_found() {
        let catalog = service();
        assert!(matches!(
            catalog.get(ItemId::new()).await,
            Err(CatalogError::NotFound)
        ));
    }
}

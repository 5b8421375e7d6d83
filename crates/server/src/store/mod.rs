//! Persistence collaborator interfaces.
//!
//! The services layer talks to storage exclusively through these traits. Each
//! method is a single-record operation; the backends guarantee per-record
//! atomicity (conditional updates, atomic increments) and nothing more. There
//! are no cross-aggregate transactions and the services never hold an
//! in-process lock across a store call.
//!
//! Two backends:
//!
//! - [`memory`] - `RwLock`-guarded maps, used in tests and for running
//!   without a database.
//! - [`postgres`] - sqlx/`PostgreSQL`, used in production.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use ladle_core::{EmailAddress, ItemId, OrderId, OrderStatus, UserId};

use crate::models::{CatalogItem, Identity, ItemPage, ItemQuery, ItemUpdate, Order, ProfileUpdate};

/// Errors surfaced by store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Requested record was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    Corruption(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted account records and their refresh-token fingerprints.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new account.
    ///
    /// Fails with [`StoreError::Conflict`] when the email, or the federated
    /// id if present, is already taken.
    async fn insert_identity(&self, identity: Identity) -> StoreResult<Identity>;

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<Identity>>;

    async fn find_by_email(&self, email: &EmailAddress) -> StoreResult<Option<Identity>>;

    async fn find_by_federated_id(&self, federated_id: &str) -> StoreResult<Option<Identity>>;

    /// Apply a partial profile update and return the updated record.
    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> StoreResult<Identity>;

    /// Attach a federated id to an existing account.
    async fn link_federated_id(&self, id: UserId, federated_id: &str) -> StoreResult<Identity>;

    /// Overwrite (or clear) the stored refresh-token fingerprint.
    ///
    /// This single-record write is the refresh-rotation point: concurrent
    /// writers race and the last one wins, leaving exactly one valid refresh
    /// token per account.
    async fn set_refresh_fingerprint(
        &self,
        id: UserId,
        fingerprint: Option<String>,
    ) -> StoreResult<()>;
}

/// Inventory and popularity state for catalog items.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_item(&self, item: CatalogItem) -> StoreResult<CatalogItem>;

    async fn find_item(&self, id: ItemId) -> StoreResult<Option<CatalogItem>>;

    /// Filtered, sorted, paginated listing plus the total match count.
    async fn list_items(&self, query: &ItemQuery) -> StoreResult<ItemPage>;

    async fn list_items_by_owner(&self, owner: &EmailAddress) -> StoreResult<Vec<CatalogItem>>;

    /// The most purchased items, by `purchase_count` descending.
    async fn top_items(&self, limit: u32) -> StoreResult<Vec<CatalogItem>>;

    /// Owner-scoped field update. Never touches `purchase_count`.
    async fn update_item(&self, id: ItemId, update: ItemUpdate) -> StoreResult<CatalogItem>;

    async fn delete_item(&self, id: ItemId) -> StoreResult<()>;

    /// Atomically add `by` to the item's purchase counter, returning the new
    /// count.
    ///
    /// Implementations must perform this as one atomic single-record update
    /// (`purchase_count = purchase_count + $by`), never a read-then-write
    /// pair, so that concurrent purchases of the same item cannot lose
    /// increments.
    async fn increment_purchase_count(&self, id: ItemId, by: u32) -> StoreResult<u64>;
}

/// Persisted orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: Order) -> StoreResult<Order>;

    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// All orders for a buyer, newest first, optionally filtered by status.
    async fn list_orders_by_buyer(
        &self,
        buyer: &EmailAddress,
        status: Option<OrderStatus>,
    ) -> StoreResult<Vec<Order>>;

    /// Paginated listing across all buyers, newest first.
    async fn list_all_orders(
        &self,
        status: Option<OrderStatus>,
        page: u32,
        limit: u32,
    ) -> StoreResult<(Vec<Order>, u64)>;

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<Order>;

    async fn delete_order(&self, id: OrderId) -> StoreResult<()>;
}

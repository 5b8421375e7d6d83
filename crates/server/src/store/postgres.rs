//! `PostgreSQL` store backend.
//!
//! Row types are plain sqlx projections; conversion into domain types
//! validates emails, roles, and statuses, surfacing bad rows as
//! [`StoreError::Corruption`]. All multi-writer state (refresh fingerprints,
//! purchase counters) is mutated with single-statement conditional updates so
//! the database provides the per-record atomicity the services rely on.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use ladle_core::{
    AuthProvider, EmailAddress, ItemId, OrderId, OrderStatus, Price, Role, UserId,
};

use super::{CatalogStore, CredentialStore, OrderStore, StoreError, StoreResult};
use crate::models::{
    CatalogItem, Identity, ItemPage, ItemQuery, ItemSortField, ItemUpdate, Order, ProfileUpdate,
    SortOrder,
};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// `PostgreSQL` implementation of all three store traits.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    photo_url: Option<String>,
    password_hash: Option<String>,
    federated_id: Option<String>,
    provider: String,
    role: String,
    active: bool,
    refresh_fingerprint: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for Identity {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = EmailAddress::parse(&row.email)
            .map_err(|e| StoreError::Corruption(format!("invalid email in database: {e}")))?;
        let provider = row
            .provider
            .parse::<AuthProvider>()
            .map_err(StoreError::Corruption)?;
        let role = row.role.parse::<Role>().map_err(StoreError::Corruption)?;

        Ok(Self {
            id: UserId::from_uuid(row.id),
            email,
            name: row.name,
            photo_url: row.photo_url,
            password_hash: row.password_hash,
            federated_id: row.federated_id,
            provider,
            role,
            active: row.active,
            refresh_fingerprint: row.refresh_fingerprint,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    name: String,
    image_url: String,
    category: String,
    description: Option<String>,
    origin: Option<String>,
    price: Decimal,
    stock_quantity: i32,
    purchase_count: i64,
    owner_email: String,
    owner_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for CatalogItem {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let owner_email = EmailAddress::parse(&row.owner_email)
            .map_err(|e| StoreError::Corruption(format!("invalid owner email in database: {e}")))?;
        let price = Price::new(row.price)
            .map_err(|e| StoreError::Corruption(format!("invalid price in database: {e}")))?;
        let stock_quantity = u32::try_from(row.stock_quantity)
            .map_err(|_| StoreError::Corruption("negative stock quantity in database".into()))?;
        let purchase_count = u64::try_from(row.purchase_count)
            .map_err(|_| StoreError::Corruption("negative purchase count in database".into()))?;

        Ok(Self {
            id: ItemId::from_uuid(row.id),
            name: row.name,
            image_url: row.image_url,
            category: row.category,
            description: row.description,
            origin: row.origin,
            price,
            stock_quantity,
            purchase_count,
            owner_email,
            owner_name: row.owner_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    item_id: Uuid,
    item_name: String,
    item_image: Option<String>,
    price_snapshot: Decimal,
    quantity: i32,
    total_price: Decimal,
    buyer_email: String,
    buyer_name: String,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let buyer_email = EmailAddress::parse(&row.buyer_email)
            .map_err(|e| StoreError::Corruption(format!("invalid buyer email in database: {e}")))?;
        let price_snapshot = Price::new(row.price_snapshot)
            .map_err(|e| StoreError::Corruption(format!("invalid price in database: {e}")))?;
        let total_price = Price::new(row.total_price)
            .map_err(|e| StoreError::Corruption(format!("invalid total in database: {e}")))?;
        let quantity = u32::try_from(row.quantity)
            .map_err(|_| StoreError::Corruption("negative quantity in database".into()))?;
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(StoreError::Corruption)?;

        Ok(Self {
            id: OrderId::from_uuid(row.id),
            item_id: ItemId::from_uuid(row.item_id),
            item_name: row.item_name,
            item_image: row.item_image,
            price_snapshot,
            quantity,
            total_price,
            buyer_email,
            buyer_name: row.buyer_name,
            status,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

/// Map a sqlx error to `Conflict` when it is a unique violation.
fn map_insert_error(e: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(format!("{what} already exists"));
    }
    StoreError::Database(e)
}

// =============================================================================
// CredentialStore
// =============================================================================

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert_identity(&self, identity: Identity) -> StoreResult<Identity> {
        let row = sqlx::query_as::<Postgres, UserRow>(
            r"
            INSERT INTO users
                (id, email, name, photo_url, password_hash, federated_id,
                 provider, role, active, refresh_fingerprint, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            ",
        )
        .bind(identity.id.into_uuid())
        .bind(identity.email.as_str())
        .bind(&identity.name)
        .bind(&identity.photo_url)
        .bind(&identity.password_hash)
        .bind(&identity.federated_id)
        .bind(identity.provider.to_string())
        .bind(identity.role.to_string())
        .bind(identity.active)
        .bind(&identity.refresh_fingerprint)
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "account"))?;

        row.try_into()
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<Identity>> {
        sqlx::query_as::<Postgres, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> StoreResult<Option<Identity>> {
        sqlx::query_as::<Postgres, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_by_federated_id(&self, federated_id: &str) -> StoreResult<Option<Identity>> {
        sqlx::query_as::<Postgres, UserRow>("SELECT * FROM users WHERE federated_id = $1")
            .bind(federated_id)
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> StoreResult<Identity> {
        let row = sqlx::query_as::<Postgres, UserRow>(
            r"
            UPDATE users
            SET name = COALESCE($2, name),
                photo_url = COALESCE($3, photo_url),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id.into_uuid())
        .bind(&update.name)
        .bind(&update.photo_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        row.try_into()
    }

    async fn link_federated_id(&self, id: UserId, federated_id: &str) -> StoreResult<Identity> {
        let row = sqlx::query_as::<Postgres, UserRow>(
            r"
            UPDATE users
            SET federated_id = $2, provider = 'federated', updated_at = now()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id.into_uuid())
        .bind(federated_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "federated id"))?
        .ok_or(StoreError::NotFound)?;

        row.try_into()
    }

    async fn set_refresh_fingerprint(
        &self,
        id: UserId,
        fingerprint: Option<String>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET refresh_fingerprint = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.into_uuid())
        .bind(&fingerprint)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// CatalogStore
// =============================================================================

/// Append the WHERE clauses for a catalog listing to a query builder.
fn push_item_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a ItemQuery) {
    if let Some(search) = &query.search {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = &query.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some(min) = query.min_price {
        builder.push(" AND price >= ").push_bind(min.amount());
    }
    if let Some(max) = query.max_price {
        builder.push(" AND price <= ").push_bind(max.amount());
    }
}

const fn sort_column(field: ItemSortField) -> &'static str {
    match field {
        ItemSortField::CreatedAt => "created_at",
        ItemSortField::Name => "name",
        ItemSortField::Price => "price",
        ItemSortField::PurchaseCount => "purchase_count",
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_item(&self, item: CatalogItem) -> StoreResult<CatalogItem> {
        let row = sqlx::query_as::<Postgres, ItemRow>(
            r"
            INSERT INTO catalog_items
                (id, name, image_url, category, description, origin, price,
                 stock_quantity, purchase_count, owner_email, owner_name,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            ",
        )
        .bind(item.id.into_uuid())
        .bind(&item.name)
        .bind(&item.image_url)
        .bind(&item.category)
        .bind(&item.description)
        .bind(&item.origin)
        .bind(item.price.amount())
        .bind(i32::try_from(item.stock_quantity).unwrap_or(i32::MAX))
        .bind(i64::try_from(item.purchase_count).unwrap_or(0))
        .bind(item.owner_email.as_str())
        .bind(&item.owner_name)
        .bind(item.created_at)
        .bind(item.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "item"))?;

        row.try_into()
    }

    async fn find_item(&self, id: ItemId) -> StoreResult<Option<CatalogItem>> {
        sqlx::query_as::<Postgres, ItemRow>("SELECT * FROM catalog_items WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_items(&self, query: &ItemQuery) -> StoreResult<ItemPage> {
        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog_items WHERE TRUE");
        push_item_filters(&mut count_builder, query);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM catalog_items WHERE TRUE");
        push_item_filters(&mut builder, query);
        builder.push(" ORDER BY ").push(sort_column(query.sort_by));
        builder.push(match query.sort_order {
            SortOrder::Asc => " ASC",
            SortOrder::Desc => " DESC",
        });
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(query.page.saturating_sub(1)) * i64::from(query.limit));

        let rows: Vec<ItemRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ItemPage {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn list_items_by_owner(&self, owner: &EmailAddress) -> StoreResult<Vec<CatalogItem>> {
        let rows = sqlx::query_as::<Postgres, ItemRow>(
            "SELECT * FROM catalog_items WHERE owner_email = $1 ORDER BY created_at DESC",
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn top_items(&self, limit: u32) -> StoreResult<Vec<CatalogItem>> {
        let rows = sqlx::query_as::<Postgres, ItemRow>(
            "SELECT * FROM catalog_items ORDER BY purchase_count DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_item(&self, id: ItemId, update: ItemUpdate) -> StoreResult<CatalogItem> {
        let row = sqlx::query_as::<Postgres, ItemRow>(
            r"
            UPDATE catalog_items
            SET name = COALESCE($2, name),
                image_url = COALESCE($3, image_url),
                category = COALESCE($4, category),
                description = COALESCE($5, description),
                origin = COALESCE($6, origin),
                price = COALESCE($7, price),
                stock_quantity = COALESCE($8, stock_quantity),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id.into_uuid())
        .bind(&update.name)
        .bind(&update.image_url)
        .bind(&update.category)
        .bind(&update.description)
        .bind(&update.origin)
        .bind(update.price.map(|p| p.amount()))
        .bind(update.stock_quantity.map(|q| i32::try_from(q).unwrap_or(i32::MAX)))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        row.try_into()
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM catalog_items WHERE id = $1")
            .bind(id.into_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn increment_purchase_count(&self, id: ItemId, by: u32) -> StoreResult<u64> {
        // Single-statement atomic increment: concurrent purchases serialize
        // on the row, so no increment is ever lost.
        let new_count: Option<i64> = sqlx::query_scalar(
            r"
            UPDATE catalog_items
            SET purchase_count = purchase_count + $2, updated_at = now()
            WHERE id = $1
            RETURNING purchase_count
            ",
        )
        .bind(id.into_uuid())
        .bind(i64::from(by))
        .fetch_optional(&self.pool)
        .await?;

        let new_count = new_count.ok_or(StoreError::NotFound)?;
        u64::try_from(new_count)
            .map_err(|_| StoreError::Corruption("negative purchase count in database".into()))
    }
}

// =============================================================================
// OrderStore
// =============================================================================

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: Order) -> StoreResult<Order> {
        let row = sqlx::query_as::<Postgres, OrderRow>(
            r"
            INSERT INTO orders
                (id, item_id, item_name, item_image, price_snapshot, quantity,
                 total_price, buyer_email, buyer_name, status, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            ",
        )
        .bind(order.id.into_uuid())
        .bind(order.item_id.into_uuid())
        .bind(&order.item_name)
        .bind(&order.item_image)
        .bind(order.price_snapshot.amount())
        .bind(i32::try_from(order.quantity).unwrap_or(i32::MAX))
        .bind(order.total_price.amount())
        .bind(order.buyer_email.as_str())
        .bind(&order.buyer_name)
        .bind(order.status.to_string())
        .bind(&order.notes)
        .bind(order.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "order"))?;

        row.try_into()
    }

    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        sqlx::query_as::<Postgres, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_orders_by_buyer(
        &self,
        buyer: &EmailAddress,
        status: Option<OrderStatus>,
    ) -> StoreResult<Vec<Order>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<Postgres, OrderRow>(
                    r"
                    SELECT * FROM orders
                    WHERE buyer_email = $1 AND status = $2
                    ORDER BY created_at DESC
                    ",
                )
                .bind(buyer.as_str())
                .bind(status.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<Postgres, OrderRow>(
                    "SELECT * FROM orders WHERE buyer_email = $1 ORDER BY created_at DESC",
                )
                .bind(buyer.as_str())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_all_orders(
        &self,
        status: Option<OrderStatus>,
        page: u32,
        limit: u32,
    ) -> StoreResult<(Vec<Order>, u64)> {
        let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders WHERE TRUE");
        if let Some(status) = status {
            count_builder
                .push(" AND status = ")
                .push_bind(status.to_string());
        }
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM orders WHERE TRUE");
        if let Some(status) = status {
            builder.push(" AND status = ").push_bind(status.to_string());
        }
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.saturating_sub(1)) * i64::from(limit));

        let rows: Vec<OrderRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        let orders = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((orders, u64::try_from(total).unwrap_or(0)))
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<Order> {
        let row = sqlx::query_as::<Postgres, OrderRow>(
            "UPDATE orders SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id.into_uuid())
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        row.try_into()
    }

    async fn delete_order(&self, id: OrderId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.into_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

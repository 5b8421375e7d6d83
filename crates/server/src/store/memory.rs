//! In-memory store backend.
//!
//! Backs tests and database-less runs. Every trait method takes each lock at
//! most once and never across an await point, so each call is atomic with
//! respect to the record it touches - the same contract the `PostgreSQL`
//! backend gets from per-record conditional updates.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use ladle_core::{EmailAddress, ItemId, OrderId, OrderStatus, UserId};

use super::{CatalogStore, CredentialStore, OrderStore, StoreError, StoreResult};
use crate::models::{
    CatalogItem, Identity, ItemPage, ItemQuery, ItemSortField, ItemUpdate, Order, ProfileUpdate,
    SortOrder,
};

/// In-memory implementation of all three store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, Identity>>,
    items: RwLock<HashMap<ItemId, CatalogItem>>,
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_identity(&self, identity: Identity) -> StoreResult<Identity> {
        let mut users = self.users.write().expect("users lock poisoned");

        if users.values().any(|u| u.email == identity.email) {
            return Err(StoreError::Conflict("email already exists".to_owned()));
        }
        if let Some(fid) = &identity.federated_id
            && users.values().any(|u| u.federated_id.as_deref() == Some(fid))
        {
            return Err(StoreError::Conflict(
                "federated id already exists".to_owned(),
            ));
        }

        users.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<Identity>> {
        Ok(self
            .users
            .read()
            .expect("users lock poisoned")
            .get(&id)
            .cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> StoreResult<Option<Identity>> {
        Ok(self
            .users
            .read()
            .expect("users lock poisoned")
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn find_by_federated_id(&self, federated_id: &str) -> StoreResult<Option<Identity>> {
        Ok(self
            .users
            .read()
            .expect("users lock poisoned")
            .values()
            .find(|u| u.federated_id.as_deref() == Some(federated_id))
            .cloned())
    }

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> StoreResult<Identity> {
        let mut users = self.users.write().expect("users lock poisoned");
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(photo_url) = update.photo_url {
            user.photo_url = Some(photo_url);
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn link_federated_id(&self, id: UserId, federated_id: &str) -> StoreResult<Identity> {
        let mut users = self.users.write().expect("users lock poisoned");
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;

        user.federated_id = Some(federated_id.to_owned());
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn set_refresh_fingerprint(
        &self,
        id: UserId,
        fingerprint: Option<String>,
    ) -> StoreResult<()> {
        let mut users = self.users.write().expect("users lock poisoned");
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;

        user.refresh_fingerprint = fingerprint;
        user.updated_at = Utc::now();

        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_item(&self, item: CatalogItem) -> StoreResult<CatalogItem> {
        self.items
            .write()
            .expect("items lock poisoned")
            .insert(item.id, item.clone());
        Ok(item)
    }

    async fn find_item(&self, id: ItemId) -> StoreResult<Option<CatalogItem>> {
        Ok(self
            .items
            .read()
            .expect("items lock poisoned")
            .get(&id)
            .cloned())
    }

    async fn list_items(&self, query: &ItemQuery) -> StoreResult<ItemPage> {
        let items = self.items.read().expect("items lock poisoned");

        let mut matches: Vec<CatalogItem> = items
            .values()
            .filter(|item| matches_query(item, query))
            .cloned()
            .collect();

        sort_items(&mut matches, query.sort_by, query.sort_order);

        let total = matches.len() as u64;
        let skip = (query.page.saturating_sub(1) as usize) * query.limit as usize;
        let page: Vec<CatalogItem> = matches
            .into_iter()
            .skip(skip)
            .take(query.limit as usize)
            .collect();

        Ok(ItemPage { items: page, total })
    }

    async fn list_items_by_owner(&self, owner: &EmailAddress) -> StoreResult<Vec<CatalogItem>> {
        let items = self.items.read().expect("items lock poisoned");

        let mut owned: Vec<CatalogItem> = items
            .values()
            .filter(|item| &item.owner_email == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(owned)
    }

    async fn top_items(&self, limit: u32) -> StoreResult<Vec<CatalogItem>> {
        let items = self.items.read().expect("items lock poisoned");

        let mut all: Vec<CatalogItem> = items.values().cloned().collect();
        all.sort_by(|a, b| b.purchase_count.cmp(&a.purchase_count));
        all.truncate(limit as usize);

        Ok(all)
    }

    async fn update_item(&self, id: ItemId, update: ItemUpdate) -> StoreResult<CatalogItem> {
        let mut items = self.items.write().expect("items lock poisoned");
        let item = items.get_mut(&id).ok_or(StoreError::NotFound)?;

        if let Some(name) = update.name {
            item.name = name;
        }
        if let Some(image_url) = update.image_url {
            item.image_url = image_url;
        }
        if let Some(category) = update.category {
            item.category = category;
        }
        if let Some(description) = update.description {
            item.description = Some(description);
        }
        if let Some(origin) = update.origin {
            item.origin = Some(origin);
        }
        if let Some(price) = update.price {
            item.price = price;
        }
        if let Some(stock_quantity) = update.stock_quantity {
            item.stock_quantity = stock_quantity;
        }
        item.updated_at = Utc::now();

        Ok(item.clone())
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        self.items
            .write()
            .expect("items lock poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn increment_purchase_count(&self, id: ItemId, by: u32) -> StoreResult<u64> {
        // Single write-lock acquisition: the read-modify-write below is
        // atomic with respect to other callers, matching the SQL
        // `purchase_count = purchase_count + $by` contract.
        let mut items = self.items.write().expect("items lock poisoned");
        let item = items.get_mut(&id).ok_or(StoreError::NotFound)?;

        item.purchase_count += u64::from(by);
        Ok(item.purchase_count)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: Order) -> StoreResult<Order> {
        self.orders
            .write()
            .expect("orders lock poisoned")
            .insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self
            .orders
            .read()
            .expect("orders lock poisoned")
            .get(&id)
            .cloned())
    }

    async fn list_orders_by_buyer(
        &self,
        buyer: &EmailAddress,
        status: Option<OrderStatus>,
    ) -> StoreResult<Vec<Order>> {
        let orders = self.orders.read().expect("orders lock poisoned");

        let mut matches: Vec<Order> = orders
            .values()
            .filter(|o| &o.buyer_email == buyer)
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matches)
    }

    async fn list_all_orders(
        &self,
        status: Option<OrderStatus>,
        page: u32,
        limit: u32,
    ) -> StoreResult<(Vec<Order>, u64)> {
        let orders = self.orders.read().expect("orders lock poisoned");

        let mut matches: Vec<Order> = orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matches.len() as u64;
        let skip = (page.saturating_sub(1) as usize) * limit as usize;
        let page_items: Vec<Order> = matches
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .collect();

        Ok((page_items, total))
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<Order> {
        let mut orders = self.orders.write().expect("orders lock poisoned");
        let order = orders.get_mut(&id).ok_or(StoreError::NotFound)?;

        order.status = status;
        Ok(order.clone())
    }

    async fn delete_order(&self, id: OrderId) -> StoreResult<()> {
        self.orders
            .write()
            .expect("orders lock poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

fn matches_query(item: &CatalogItem, query: &ItemQuery) -> bool {
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        let in_name = item.name.to_lowercase().contains(&needle);
        let in_description = item
            .description
            .as_ref()
            .is_some_and(|d| d.to_lowercase().contains(&needle));
        if !in_name && !in_description {
            return false;
        }
    }

    if let Some(category) = &query.category
        && &item.category != category
    {
        return false;
    }

    if let Some(min) = query.min_price
        && item.price < min
    {
        return false;
    }

    if let Some(max) = query.max_price
        && item.price > max
    {
        return false;
    }

    true
}

fn sort_items(items: &mut [CatalogItem], field: ItemSortField, order: SortOrder) {
    items.sort_by(|a, b| {
        let ordering = match field {
            ItemSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            ItemSortField::Name => a.name.cmp(&b.name),
            ItemSortField::Price => a.price.cmp(&b.price),
            ItemSortField::PurchaseCount => a.purchase_count.cmp(&b.purchase_count),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

//! Catalog item domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ladle_core::{EmailAddress, ItemId, Price};

/// A sellable menu item.
///
/// `purchase_count` is mutated only through the store's atomic increment,
/// driven by the order workflow. Every other field is mutated only by the
/// item's owner. The two write paths never touch the same columns.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub image_url: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub price: Price,
    pub stock_quantity: u32,
    /// Cumulative number of units purchased. Monotonically non-decreasing.
    pub purchase_count: u64,
    pub owner_email: EmailAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner-scoped partial update; `None` fields are left unchanged.
///
/// Deliberately excludes `purchase_count` - that counter belongs to the
/// order workflow's write path.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub origin: Option<String>,
    pub price: Option<Price>,
    pub stock_quantity: Option<u32>,
}

/// Field to sort a catalog listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemSortField {
    #[default]
    CreatedAt,
    Name,
    Price,
    PurchaseCount,
}

impl std::str::FromStr for ItemSortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(Self::CreatedAt),
            "name" => Ok(Self::Name),
            "price" => Ok(Self::Price),
            "purchase_count" => Ok(Self::PurchaseCount),
            _ => Err(format!("invalid sort field: {s}")),
        }
    }
}

/// Listing sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(format!("invalid sort order: {s}")),
        }
    }
}

/// Catalog listing filters and pagination.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    /// Case-insensitive substring match on name or description.
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
    pub sort_by: ItemSortField,
    pub sort_order: SortOrder,
}

/// One page of catalog items plus the total match count.
#[derive(Debug, Clone)]
pub struct ItemPage {
    pub items: Vec<CatalogItem>,
    pub total: u64,
}

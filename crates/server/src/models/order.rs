//! Order domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ladle_core::{EmailAddress, ItemId, OrderId, OrderStatus, Price};

/// A purchase of a catalog item.
///
/// Item name, image, and price are snapshots taken when the order was placed;
/// later edits to the item do not affect existing orders. `total_price` is
/// computed once at creation from `price_snapshot * quantity` and is never
/// recomputed or altered by status transitions.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub item_id: ItemId,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_image: Option<String>,
    pub price_snapshot: Price,
    pub quantity: u32,
    pub total_price: Price,
    pub buyer_email: EmailAddress,
    pub buyer_name: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

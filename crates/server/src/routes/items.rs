//! Catalog item route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use ladle_core::{ItemId, Price};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{CatalogItem, ItemQuery, ItemSortField, ItemUpdate, SortOrder};
use crate::response::{ApiResponse, Paginated, Pagination};
use crate::services::catalog::{DEFAULT_PAGE_LIMIT, NewItem};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub image_url: String,
    pub category: String,
    pub description: Option<String>,
    pub origin: Option<String>,
    pub price: Decimal,
    pub stock_quantity: Option<u32>,
    pub owner_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub origin: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<u32>,
}

fn parse_price(value: Decimal) -> Result<Price> {
    Price::new(value).map_err(|e| AppError::BadRequest(e.to_string()))
}

impl ListParams {
    fn into_query(self) -> Result<ItemQuery> {
        let sort_by = match self.sort_by.as_deref() {
            Some(s) => s
                .parse::<ItemSortField>()
                .map_err(AppError::BadRequest)?,
            None => ItemSortField::default(),
        };
        let sort_order = match self.sort_order.as_deref() {
            Some(s) => s.parse::<SortOrder>().map_err(AppError::BadRequest)?,
            None => SortOrder::default(),
        };

        Ok(ItemQuery {
            search: self.search.filter(|s| !s.is_empty()),
            category: self.category.filter(|c| !c.is_empty()),
            min_price: self.min_price.map(parse_price).transpose()?,
            max_price: self.max_price.map(parse_price).transpose()?,
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            sort_by,
            sort_order,
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/v1/items`
///
/// Public listing. Takes optional auth: a bad or missing bearer token does
/// not fail the request, it just means no identity.
pub async fn list(
    State(state): State<AppState>,
    OptionalAuth(claims): OptionalAuth,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Paginated<CatalogItem>>>> {
    tracing::debug!(caller = claims.as_ref().map(|c| c.email.as_str()), "listing items");

    let query = params.into_query()?;
    let (page, limit) = (query.page.max(1), query.limit.clamp(1, 100));
    let result = state.catalog().list(query).await?;

    Ok(Json(ApiResponse::ok(Paginated {
        pagination: Pagination::new(result.total, page, limit),
        items: result.items,
    })))
}

/// `GET /api/v1/items/top`
pub async fn top(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<Json<ApiResponse<Vec<CatalogItem>>>> {
    let items = state.catalog().top(params.limit).await?;
    Ok(Json(ApiResponse::ok(items)))
}

/// `GET /api/v1/items/mine`
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<ApiResponse<Vec<CatalogItem>>>> {
    let owner = ladle_core::EmailAddress::parse(&claims.email)
        .map_err(|e| AppError::Internal(format!("invalid email in claims: {e}")))?;
    let items = state.catalog().mine(&owner).await?;
    Ok(Json(ApiResponse::ok(items)))
}

/// `GET /api/v1/items/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<ApiResponse<CatalogItem>>> {
    let item = state.catalog().get(id).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// `POST /api/v1/items`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Json(request): Json<CreateItemRequest>,
) -> Result<impl IntoResponse> {
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_owned()));
    }
    if request.category.trim().is_empty() {
        return Err(AppError::BadRequest("category is required".to_owned()));
    }

    let item = state
        .catalog()
        .create(
            &claims,
            request.owner_name,
            NewItem {
                name: request.name,
                image_url: request.image_url,
                category: request.category,
                description: request.description,
                origin: request.origin,
                price: parse_price(request.price)?,
                stock_quantity: request.stock_quantity.unwrap_or(0),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(item))))
}

/// `PATCH /api/v1/items/{id}`
///
/// Owner-only; the ownership check runs before any write.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<ItemId>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<CatalogItem>>> {
    let update = ItemUpdate {
        name: request.name,
        image_url: request.image_url,
        category: request.category,
        description: request.description,
        origin: request.origin,
        price: request.price.map(parse_price).transpose()?,
        stock_quantity: request.stock_quantity,
    };

    let item = state.catalog().update(&claims, id, update).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// `DELETE /api/v1/items/{id}`
///
/// Owner-only; the ownership check runs before any write.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<ItemId>,
) -> Result<Json<ApiResponse<()>>> {
    state.catalog().delete(&claims, id).await?;
    Ok(Json(ApiResponse::message("Menu item deleted successfully")))
}

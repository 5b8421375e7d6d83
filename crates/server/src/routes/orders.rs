//! Order route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use ladle_core::{ItemId, OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::Order;
use crate::response::{ApiResponse, Paginated, Pagination};
use crate::services::orders::PlaceOrder;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub item_id: ItemId,
    /// Defaults to 1.
    pub quantity: Option<u32>,
    pub buyer_name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StatusFilter {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AdminListParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

fn parse_status(value: &str) -> Result<OrderStatus> {
    value.parse::<OrderStatus>().map_err(AppError::BadRequest)
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/v1/orders`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse> {
    if request.buyer_name.trim().is_empty() {
        return Err(AppError::BadRequest("buyer_name is required".to_owned()));
    }

    let order = state
        .orders()
        .place(
            &claims,
            PlaceOrder {
                item_id: request.item_id,
                quantity: request.quantity.unwrap_or(1),
                buyer_name: request.buyer_name,
                notes: request.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(order))))
}

/// `GET /api/v1/orders/mine`
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let status = filter.status.as_deref().map(parse_status).transpose()?;
    let orders = state.orders().mine(&claims, status).await?;
    Ok(Json(ApiResponse::ok(orders)))
}

/// `GET /api/v1/orders/{id}`
pub async fn get(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = state.orders().get(&claims, id).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// `PATCH /api/v1/orders/{id}/status`
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<OrderId>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Order>>> {
    let next = parse_status(&request.status)?;
    let order = state.orders().update_status(&claims, id, next).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// `DELETE /api/v1/orders/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<()>>> {
    state.orders().delete(&claims, id).await?;
    Ok(Json(ApiResponse::message("Order deleted successfully")))
}

/// `GET /api/v1/orders/admin/all`
///
/// Admin role required. Broadens read visibility only - admin does not
/// bypass ownership checks on individual order mutation.
pub async fn admin_all(
    State(state): State<AppState>,
    RequireAdmin(_claims): RequireAdmin,
    Query(params): Query<AdminListParams>,
) -> Result<Json<ApiResponse<Paginated<Order>>>> {
    let status = params.status.as_deref().map(parse_status).transpose()?;
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let (orders, total) = state.orders().all(status, page, limit).await?;

    Ok(Json(ApiResponse::ok(Paginated {
        pagination: Pagination::new(total, page, limit),
        items: orders,
    })))
}

//! Admin order ledger routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use okra_core::{OrderId, OrderStatus};

use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::services::{OrderService, OrderStore};
use crate::state::AppState;

/// Every order, newest first.
///
/// GET /api/admin/orders
///
/// # Errors
///
/// 401/403 without an admin login.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<Order>>> {
    let orders = state.orders().list_all().await?;
    Ok(Json(orders))
}

/// One order with its items.
///
/// GET /api/admin/orders/{id}
///
/// # Errors
///
/// 404 for unknown orders.
pub async fn detail(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .get(OrderId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Order".into()))?;
    Ok(Json(order))
}

/// Request to advance an order's fulfillment status.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

/// Advance an order's fulfillment status. Only forward transitions the
/// state machine allows are accepted.
///
/// PUT /api/admin/orders/{id}/status
///
/// # Errors
///
/// 404 for unknown orders, 400 for an illegal transition.
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i32>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<Order>> {
    let orders = state.orders();
    let service = OrderService::new(&orders, state.gateway());
    let order = service.set_status(OrderId::new(id), req.status).await?;
    Ok(Json(order))
}

/// Delete an order and its item snapshot.
///
/// DELETE /api/admin/orders/{id}
///
/// # Errors
///
/// 404 for unknown orders.
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    state.orders().delete(OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

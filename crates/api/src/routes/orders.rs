//! Shopper-facing order routes.

use axum::{
    Json,
    extract::{Path, State},
};
use tower_sessions::Session;

use okra_core::{GuestId, OrderId, Owner};

use crate::error::{ApiError, Result};
use crate::middleware::OptionalIdentity;
use crate::models::{CurrentIdentity, Order, session_keys};
use crate::services::OrderService;
use crate::state::AppState;

/// Resolve who the caller is for order-ledger purposes.
///
/// Guests are identified by the guest id minted at their first checkout; a
/// session that never checked out has no orders to see.
async fn resolve_owner(
    session: &Session,
    identity: Option<CurrentIdentity>,
) -> Result<Option<Owner>> {
    match identity {
        Some(CurrentIdentity::User { id, .. }) => Ok(Some(Owner::User(id))),
        _ => Ok(session
            .get::<GuestId>(session_keys::GUEST_ID)
            .await?
            .map(Owner::Guest)),
    }
}

/// The caller's orders, newest first.
///
/// GET /api/users/orders
///
/// # Errors
///
/// 500 on database failure. A guest session with no checkout history gets
/// an empty list.
pub async fn list(
    State(state): State<AppState>,
    session: Session,
    OptionalIdentity(identity): OptionalIdentity,
) -> Result<Json<Vec<Order>>> {
    let Some(owner) = resolve_owner(&session, identity).await? else {
        return Ok(Json(Vec::new()));
    };

    let orders = state.orders();
    let service = OrderService::new(&orders, state.gateway());
    Ok(Json(service.list_for_owner(&owner).await?))
}

/// One of the caller's orders.
///
/// GET /api/users/orders/{id}
///
/// # Errors
///
/// 404 for unknown orders, 403 for orders owned by someone else.
pub async fn detail(
    State(state): State<AppState>,
    session: Session,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let owner = resolve_owner(&session, identity)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order".into()))?;

    let orders = state.orders();
    let service = OrderService::new(&orders, state.gateway());
    let order = service.get_for_owner(OrderId::new(id), &owner).await?;
    Ok(Json(order))
}

/// Cancel one of the caller's orders. Allowed only while fulfillment is
/// still pending.
///
/// POST /api/users/orders/{id}/cancel
///
/// # Errors
///
/// 404 for unknown orders, 403 for orders owned by someone else, 400 once
/// fulfillment has started.
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let owner = resolve_owner(&session, identity)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order".into()))?;

    let orders = state.orders();
    let service = OrderService::new(&orders, state.gateway());
    let order = service.cancel(OrderId::new(id), &owner).await?;
    Ok(Json(order))
}

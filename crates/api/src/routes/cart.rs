//! Cart routes.
//!
//! The same five endpoints serve logged-in shoppers and guests. Which
//! backend holds the cart is decided per request: a shopper identity routes
//! to the persisted cart, anything else to the session cart.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use okra_core::{Price, ProductId};

use crate::db::ProductRepository;
use crate::error::{ApiError, Result};
use crate::middleware::OptionalIdentity;
use crate::models::{Cart, CartItem, CurrentIdentity, LineSnapshot};
use crate::services::{CartStore, DbCartStore, SessionCartStore};
use crate::state::AppState;

/// Pick the cart backend for this request.
fn store_for(
    state: &AppState,
    session: &Session,
    identity: Option<&CurrentIdentity>,
) -> Arc<dyn CartStore> {
    match identity {
        Some(CurrentIdentity::User { id, .. }) => {
            Arc::new(DbCartStore::new(state.pool().clone(), *id))
        }
        // Admins browsing the shop get a session cart like any guest.
        _ => Arc::new(SessionCartStore::new(session.clone())),
    }
}

/// Cart contents plus derived totals.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub item_count: i64,
    pub total_amount: Price,
}

fn respond(cart: Cart) -> Result<Json<CartResponse>> {
    let total_amount = cart
        .total_amount()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(CartResponse {
        item_count: cart.item_count(),
        items: cart.items,
        total_amount,
    }))
}

/// Current cart contents.
///
/// GET /api/users/cart
///
/// # Errors
///
/// 500 on backend failure.
pub async fn read(
    State(state): State<AppState>,
    session: Session,
    OptionalIdentity(identity): OptionalIdentity,
) -> Result<Json<CartResponse>> {
    let store = store_for(&state, &session, identity.as_ref());
    respond(store.read().await?)
}

/// Request to add a product to the cart.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: i32,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Add a product to the cart, merging with an existing line for the same
/// variant. The line snapshots the product's current name, price, and image.
///
/// POST /api/users/cart
///
/// # Errors
///
/// 404 for unknown products, 400 for a non-positive quantity.
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalIdentity(identity): OptionalIdentity,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<CartResponse>> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(req.product_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Product".into()))?;

    let store = store_for(&state, &session, identity.as_ref());
    let cart = store
        .add_line(LineSnapshot::of(&product), req.quantity, req.size, req.color)
        .await?;
    respond(cart)
}

/// Request to set a cart line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub product_id: i32,
    pub quantity: i32,
}

/// Set the quantity of a cart line.
///
/// PUT /api/users/cart
///
/// # Errors
///
/// 404 when the product is not in the cart, 400 for a non-positive quantity.
pub async fn update_quantity(
    State(state): State<AppState>,
    session: Session,
    OptionalIdentity(identity): OptionalIdentity,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>> {
    let store = store_for(&state, &session, identity.as_ref());
    let cart = store
        .update_quantity(ProductId::new(req.product_id), req.quantity)
        .await?;
    respond(cart)
}

/// Remove a product's line from the cart.
///
/// DELETE /api/users/cart/remove/{product_id}
///
/// # Errors
///
/// 404 when the product is not in the cart.
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalIdentity(identity): OptionalIdentity,
    Path(product_id): Path<i32>,
) -> Result<Json<CartResponse>> {
    let store = store_for(&state, &session, identity.as_ref());
    let cart = store.remove(ProductId::new(product_id)).await?;
    respond(cart)
}

/// Empty the cart. Idempotent.
///
/// DELETE /api/users/cart/clear
///
/// # Errors
///
/// 500 on backend failure.
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalIdentity(identity): OptionalIdentity,
) -> Result<Json<CartResponse>> {
    let store = store_for(&state, &session, identity.as_ref());
    respond(store.clear().await?)
}

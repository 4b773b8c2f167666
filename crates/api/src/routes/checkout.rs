//! Checkout and payment-callback routes.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use okra_core::{Email, OrderId, Owner, Price};

use crate::error::Result;
use crate::middleware::{OptionalIdentity, current_guest_id};
use crate::models::{CurrentIdentity, Order, ShippingAddress};
use crate::services::{CartStore, CheckoutService, DbCartStore, OrderService, SessionCartStore};
use crate::state::AppState;

/// Request to place an order from the current cart.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
}

/// Successful checkout: the order exists and the shopper should be sent to
/// `authorization_url` to pay.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub total_amount: Price,
    pub authorization_url: String,
    pub reference: String,
    /// Present for guest checkouts; correlates later order lookups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,
}

/// Place an order from the caller's cart and open a payment session.
///
/// POST /api/users/checkout
///
/// Guests get a guest id minted into their session on first checkout; their
/// receipt email is synthesized from it.
///
/// # Errors
///
/// 400 for an empty cart, bad address, or insufficient stock; 404 when a
/// cart line's product no longer exists; 500 when the payment provider is
/// unreachable (the order stays pending in that case).
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    OptionalIdentity(identity): OptionalIdentity,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let service = CheckoutService::new(
        Arc::new(state.inventory()),
        Arc::new(state.orders()),
        state.gateway_handle(),
    );
    // The callback closure rides along on the settle task, so it owns a
    // state handle instead of borrowing the config.
    let callback_url_for = {
        let state = state.clone();
        move |order_id| state.config().payment_callback_url(order_id)
    };

    let receipt = match identity {
        Some(CurrentIdentity::User { id, ref email }) => {
            let store: Arc<dyn CartStore> = Arc::new(DbCartStore::new(state.pool().clone(), id));
            service
                .checkout(
                    store,
                    Owner::User(id),
                    email,
                    req.shipping_address,
                    callback_url_for,
                )
                .await?
        }
        _ => {
            let guest_id = current_guest_id(&session).await?;
            let email = Email::for_guest(&guest_id);
            let store: Arc<dyn CartStore> = Arc::new(SessionCartStore::new(session.clone()));
            let receipt = service
                .checkout(
                    store,
                    Owner::Guest(guest_id.clone()),
                    &email,
                    req.shipping_address,
                    callback_url_for,
                )
                .await?;
            return Ok((
                StatusCode::CREATED,
                Json(CheckoutResponse {
                    order_id: receipt.order_id,
                    total_amount: receipt.total_amount,
                    authorization_url: receipt.authorization_url,
                    reference: receipt.reference,
                    guest_id: Some(guest_id.as_str().to_owned()),
                }),
            ));
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: receipt.order_id,
            total_amount: receipt.total_amount,
            authorization_url: receipt.authorization_url,
            reference: receipt.reference,
            guest_id: None,
        }),
    ))
}

/// Query string the payment provider appends when redirecting back.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub reference: String,
}

/// Payment provider return URL. Verifies the transaction and settles the
/// order; replays are no-ops that still return the order's current state.
///
/// GET /api/users/payment/callback/{order_id}?reference=...
///
/// # Errors
///
/// 404 for unknown orders or references that were never issued for the
/// order; 500 when verification itself fails (the order stays pending).
pub async fn payment_callback(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<Order>> {
    let orders = state.orders();
    let service = OrderService::new(&orders, state.gateway());
    let order = service
        .confirm_payment(OrderId::new(order_id), &query.reference)
        .await?;
    Ok(Json(order))
}

//! Checkout orchestration.
//!
//! One entry point, [`CheckoutService::checkout`], drives the whole flow:
//! read the cart, validate stock, reserve it atomically, snapshot the cart
//! into an order, clear the cart, and open a payment session with the
//! provider. Every collaborator is a shared trait object, so the full
//! pipeline runs in tests against in-memory stores and a scripted gateway.
//!
//! Everything after the reservation commits runs on its own task: the
//! handler future is dropped when the client disconnects, and an abandoned
//! pipeline at that point would leak decremented stock with no order to
//! show for it.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{info, warn};

use okra_core::{Email, OrderId, Owner, Price, PriceError, ProductId};

use crate::db::{RepositoryError, ReserveOutcome};
use crate::error::ApiError;
use crate::models::{NewOrder, ShippingAddress};
use crate::services::cart::{CartError, CartStore};
use crate::services::inventory::{InventoryStore, Reservation};
use crate::services::orders::OrderStore;
use crate::services::payment::{GatewayError, PaymentGateway};

/// Errors from the checkout pipeline.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout with nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Shipping address failed validation.
    #[error("shipping address is missing {0}")]
    Address(&'static str),

    /// A cart line references a product that no longer exists.
    #[error("{name} is no longer available")]
    ProductGone { name: String },

    /// A product has less stock than the cart demands.
    #[error("insufficient stock for {name}, available: {available}")]
    InsufficientStock { name: String, available: i32 },

    /// Order total arithmetic overflowed.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// Cart backend failure.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The payment provider could not open a session. The order exists and
    /// stays pending.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The settle task died before reporting back (runtime shutdown or a
    /// panic in a store).
    #[error("checkout task failed: {0}")]
    Task(#[from] JoinError),
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => Self::Validation("cart is empty".into()),
            CheckoutError::Address(field) => {
                Self::Validation(format!("shipping address is missing {field}"))
            }
            CheckoutError::ProductGone { name } => Self::NotFound(name),
            CheckoutError::InsufficientStock { name, available } => {
                Self::InsufficientStock { name, available }
            }
            CheckoutError::Price(price) => Self::Validation(price.to_string()),
            CheckoutError::Cart(cart) => cart.into(),
            CheckoutError::Repository(repo) => Self::Database(repo),
            CheckoutError::Gateway(gateway) => Self::Gateway(gateway),
            CheckoutError::Task(join) => Self::Internal(join.to_string()),
        }
    }
}

/// What the shopper gets back from a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub total_amount: Price,
    /// Hosted payment page to redirect the shopper to.
    pub authorization_url: String,
    /// Provider transaction reference.
    pub reference: String,
}

/// Checkout pipeline over the cart, inventory, order, and payment seams.
#[derive(Clone)]
pub struct CheckoutService {
    inventory: Arc<dyn InventoryStore>,
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    /// Create the service.
    #[must_use]
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        orders: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            inventory,
            orders,
            gateway,
        }
    }

    /// Run a checkout for `owner`'s cart.
    ///
    /// `email` is where the provider sends the receipt; guests get a
    /// synthetic address derived from their guest id. `callback_url_for`
    /// builds the provider's return URL once the order id is known.
    ///
    /// Stock is reserved all-or-nothing before the order is written; if the
    /// order write then fails, the reservation is released. Once the order
    /// exists the cart is cleared, and a payment-session failure leaves the
    /// order pending for a later retry rather than rolling anything back.
    ///
    /// Dropping the returned future only cancels checkout up to the point
    /// where stock is reserved; from there the pipeline runs to completion
    /// on a spawned task.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]; no stock is held on any error except
    /// `CheckoutError::Gateway`.
    pub async fn checkout<F>(
        &self,
        cart_store: Arc<dyn CartStore>,
        owner: Owner,
        email: &Email,
        shipping_address: ShippingAddress,
        callback_url_for: F,
    ) -> Result<CheckoutReceipt, CheckoutError>
    where
        F: FnOnce(OrderId) -> String + Send + 'static,
    {
        shipping_address
            .validate()
            .map_err(CheckoutError::Address)?;

        let cart = cart_store.read().await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Validation pass over the whole cart before any stock moves, so a
        // shortfall on the last line costs nothing.
        let mut demands = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = self.fetch_product(item.product_id, &item.name).await?;
            if product.quantity < item.quantity {
                return Err(CheckoutError::InsufficientStock {
                    name: product.name,
                    available: product.quantity,
                });
            }
            demands.push(Reservation {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }

        // The conditional decrement re-checks under the transaction, so a
        // concurrent checkout that won the race surfaces here as Short.
        if let ReserveOutcome::Short(product_id) = self.inventory.reserve(&demands).await? {
            // The cart line still knows the product's name even if the
            // product was deleted out from under us.
            let name = cart
                .items
                .iter()
                .find(|item| item.product_id == product_id)
                .map_or_else(|| "product".to_owned(), |item| item.name.clone());
            let available = self
                .inventory
                .product(product_id)
                .await?
                .map_or(0, |product| product.quantity);
            return Err(CheckoutError::InsufficientStock { name, available });
        }

        let draft = NewOrder::from_cart(owner, &cart, shipping_address)?;

        // Stock is committed from here on. Detach from the caller so a
        // dropped handler future cannot abandon the reservation half-settled.
        let service = self.clone();
        let email = email.clone();
        tokio::spawn(async move {
            service
                .settle(cart_store, draft, email, demands, callback_url_for)
                .await
        })
        .await?
    }

    /// Turn a committed reservation into an order with an open payment
    /// session. Runs on its own task; see [`CheckoutService::checkout`].
    async fn settle<F>(
        &self,
        cart_store: Arc<dyn CartStore>,
        draft: NewOrder,
        email: Email,
        demands: Vec<Reservation>,
        callback_url_for: F,
    ) -> Result<CheckoutReceipt, CheckoutError>
    where
        F: FnOnce(OrderId) -> String + Send,
    {
        let order = match self.orders.create(&draft).await {
            Ok(order) => order,
            Err(err) => {
                // Hand the reserved stock back before surfacing the failure.
                if let Err(release_err) = self.inventory.release(&demands).await {
                    warn!(error = %release_err, "failed to release stock after order write failure");
                }
                return Err(err.into());
            }
        };

        cart_store.clear().await?;
        info!(order_id = %order.id, total = %order.total_amount, "order created");

        let callback_url = callback_url_for(order.id);
        let session = match self
            .gateway
            .initialize(order.total_amount, &email, &callback_url)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                // The order stands; a later payment attempt can settle it.
                warn!(order_id = %order.id, error = %err, "payment session failed, order left pending");
                return Err(err.into());
            }
        };

        self.orders
            .set_payment_reference(order.id, &session.reference)
            .await?;

        Ok(CheckoutReceipt {
            order_id: order.id,
            total_amount: order.total_amount,
            authorization_url: session.authorization_url,
            reference: session.reference,
        })
    }

    async fn fetch_product(
        &self,
        id: ProductId,
        fallback_name: &str,
    ) -> Result<crate::models::Product, CheckoutError> {
        self.inventory
            .product(id)
            .await?
            .ok_or_else(|| CheckoutError::ProductGone {
                name: fallback_name.to_owned(),
            })
    }
}

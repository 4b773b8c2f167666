//! Order lifecycle service.
//!
//! Wraps the order store with the rules that are easy to get wrong at the
//! handler level: ownership checks, the payment-callback idempotency
//! contract, and status-transition validation against
//! `OrderStatus::can_advance_to`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use okra_core::{OrderId, OrderStatus, Owner};

use crate::db::{OrderRepository, RepositoryError, SweepOutcome};
use crate::error::ApiError;
use crate::models::{NewOrder, Order};
use crate::services::payment::{GatewayError, PaymentGateway, VerifiedPayment};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No such order.
    #[error("order not found")]
    NotFound,

    /// The caller does not own the order.
    #[error("order belongs to another shopper")]
    Forbidden,

    /// The requested status change is not a legal transition.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Payment provider failure during verification.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound => Self::NotFound("Order".into()),
            OrderError::Forbidden => Self::Forbidden("You do not own this order".into()),
            OrderError::InvalidTransition { from, to } => {
                Self::InvalidState(format!("cannot move order from {from} to {to}"))
            }
            OrderError::Gateway(gateway) => Self::Gateway(gateway),
            OrderError::Repository(repo) => Self::Database(repo),
        }
    }
}

/// Persistence seam for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a draft order; statuses start pending/pending.
    async fn create(&self, draft: &NewOrder) -> Result<Order, RepositoryError>;

    /// Fetch one order with its items.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// All orders for one shopper or guest, newest first.
    async fn list_for_owner(&self, owner: &Owner) -> Result<Vec<Order>, RepositoryError>;

    /// Every order, newest first (admin view).
    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Attach the provider's transaction reference.
    async fn set_payment_reference(
        &self,
        id: OrderId,
        reference: &str,
    ) -> Result<(), RepositoryError>;

    /// pending payment -> paid, fulfillment -> processing. `false` when the
    /// payment was already settled.
    async fn confirm_paid(&self, id: OrderId) -> Result<bool, RepositoryError>;

    /// pending payment -> failed. `false` when already settled.
    async fn mark_payment_failed(&self, id: OrderId) -> Result<bool, RepositoryError>;

    /// pending fulfillment -> cancelled. `false` when fulfillment already
    /// moved on.
    async fn cancel(&self, id: OrderId) -> Result<bool, RepositoryError>;

    /// Conditional fulfillment advance `from -> to`. `false` when the order
    /// was no longer at `from`.
    async fn advance(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError>;

    /// Remove an order and its items.
    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError>;

    /// One pass of time-based fulfillment promotion.
    async fn sweep_fulfillment(&self, now: DateTime<Utc>) -> Result<SweepOutcome, RepositoryError>;
}

/// `PostgreSQL`-backed order store over [`OrderRepository`]. Owns a pool
/// handle so the store can outlive the request that built it.
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create an order store over the order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> OrderRepository<'_> {
        OrderRepository::new(&self.pool)
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, draft: &NewOrder) -> Result<Order, RepositoryError> {
        self.repo().create(draft).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.repo().get(id).await
    }

    async fn list_for_owner(&self, owner: &Owner) -> Result<Vec<Order>, RepositoryError> {
        self.repo().list_for_owner(owner).await
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        self.repo().list_all().await
    }

    async fn set_payment_reference(
        &self,
        id: OrderId,
        reference: &str,
    ) -> Result<(), RepositoryError> {
        self.repo().set_payment_reference(id, reference).await
    }

    async fn confirm_paid(&self, id: OrderId) -> Result<bool, RepositoryError> {
        self.repo().confirm_paid(id).await
    }

    async fn mark_payment_failed(&self, id: OrderId) -> Result<bool, RepositoryError> {
        self.repo().mark_payment_failed(id).await
    }

    async fn cancel(&self, id: OrderId) -> Result<bool, RepositoryError> {
        self.repo().cancel(id).await
    }

    async fn advance(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        self.repo().advance(id, from, to).await
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        self.repo().delete(id).await
    }

    async fn sweep_fulfillment(&self, now: DateTime<Utc>) -> Result<SweepOutcome, RepositoryError> {
        self.repo().sweep_fulfillment(now).await
    }
}

/// Order operations above raw persistence.
pub struct OrderService<'a> {
    store: &'a dyn OrderStore,
    gateway: &'a dyn PaymentGateway,
}

impl<'a> OrderService<'a> {
    /// Create the service over a store and gateway.
    #[must_use]
    pub const fn new(store: &'a dyn OrderStore, gateway: &'a dyn PaymentGateway) -> Self {
        Self { store, gateway }
    }

    /// Fetch one order, verifying the caller owns it.
    ///
    /// # Errors
    ///
    /// `OrderError::NotFound` for missing orders, `OrderError::Forbidden`
    /// when the order belongs to someone else.
    pub async fn get_for_owner(&self, id: OrderId, owner: &Owner) -> Result<Order, OrderError> {
        let order = self.store.get(id).await?.ok_or(OrderError::NotFound)?;
        if !order.owned_by(owner) {
            return Err(OrderError::Forbidden);
        }
        Ok(order)
    }

    /// All of the caller's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on database failure.
    pub async fn list_for_owner(&self, owner: &Owner) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_for_owner(owner).await?)
    }

    /// Settle an order after the shopper returns from the payment page.
    ///
    /// Verifies `reference` with the provider and applies the verdict:
    /// success moves the payment to paid and fulfillment to processing,
    /// failure marks the payment failed. Both writes are conditional on the
    /// payment still being pending, so a replayed callback changes nothing
    /// and still responds successfully with the order's current state.
    ///
    /// # Errors
    ///
    /// `OrderError::NotFound` for unknown orders, `OrderError::Gateway` when
    /// verification itself fails. In the latter case the order stays pending
    /// and a later callback can settle it.
    pub async fn confirm_payment(
        &self,
        id: OrderId,
        reference: &str,
    ) -> Result<Order, OrderError> {
        let order = self.store.get(id).await?.ok_or(OrderError::NotFound)?;

        // A reference we never issued for this order settles nothing.
        if order.payment_reference.as_deref() != Some(reference) {
            warn!(order_id = %id, reference, "callback reference does not match order");
            return Err(OrderError::NotFound);
        }

        match self.gateway.verify(reference).await? {
            VerifiedPayment::Success => {
                let applied = self.store.confirm_paid(id).await?;
                if applied {
                    info!(order_id = %id, "payment confirmed, order processing");
                } else {
                    info!(order_id = %id, "callback replay, payment already settled");
                }
            }
            VerifiedPayment::Failed => {
                let applied = self.store.mark_payment_failed(id).await?;
                if applied {
                    // TODO: release the stock reserved at checkout once a
                    // failed payment is final rather than retryable.
                    warn!(order_id = %id, "payment failed");
                }
            }
        }

        self.store.get(id).await?.ok_or(OrderError::NotFound)
    }

    /// Cancel an order. Only the owner may cancel, and only while
    /// fulfillment is still pending.
    ///
    /// # Errors
    ///
    /// `OrderError::Forbidden` for non-owners, `OrderError::InvalidTransition`
    /// when fulfillment has already started (including losing the race to a
    /// concurrent advance).
    pub async fn cancel(&self, id: OrderId, owner: &Owner) -> Result<Order, OrderError> {
        let order = self.get_for_owner(id, owner).await?;

        if !order.order_status.can_advance_to(OrderStatus::Cancelled) {
            return Err(OrderError::InvalidTransition {
                from: order.order_status,
                to: OrderStatus::Cancelled,
            });
        }

        let applied = self.store.cancel(id).await?;
        if !applied {
            // Fulfillment advanced between our read and the update.
            let current = self.store.get(id).await?.ok_or(OrderError::NotFound)?;
            return Err(OrderError::InvalidTransition {
                from: current.order_status,
                to: OrderStatus::Cancelled,
            });
        }

        // TODO: return the cancelled order's reserved quantities to stock.
        info!(order_id = %id, "order cancelled");
        self.store.get(id).await?.ok_or(OrderError::NotFound)
    }

    /// Admin override of fulfillment status, validated against the state
    /// machine.
    ///
    /// # Errors
    ///
    /// `OrderError::InvalidTransition` when the requested edge is not legal
    /// from the order's current status.
    pub async fn set_status(&self, id: OrderId, to: OrderStatus) -> Result<Order, OrderError> {
        let order = self.store.get(id).await?.ok_or(OrderError::NotFound)?;
        let from = order.order_status;

        if !from.can_advance_to(to) {
            return Err(OrderError::InvalidTransition { from, to });
        }

        let applied = self.store.advance(id, from, to).await?;
        if !applied {
            let current = self.store.get(id).await?.ok_or(OrderError::NotFound)?;
            return Err(OrderError::InvalidTransition {
                from: current.order_status,
                to,
            });
        }

        info!(order_id = %id, %from, %to, "order status advanced");
        self.store.get(id).await?.ok_or(OrderError::NotFound)
    }
}

//! Inventory seam for checkout.
//!
//! Checkout reserves stock through [`InventoryStore`] rather than touching
//! the product repository directly, so the pipeline can be exercised against
//! an in-memory implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use okra_core::ProductId;

use crate::db::{ProductRepository, RepositoryError, ReserveOutcome};
use crate::models::Product;

/// A quantity of one product that checkout wants to reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Stock lookup and all-or-nothing reservation.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Fetch a product by id.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Atomically decrement stock for every reservation, or none of them.
    ///
    /// Returns `ReserveOutcome::Short(id)` naming the first product whose
    /// stock was insufficient; in that case no stock was taken.
    async fn reserve(&self, demands: &[Reservation]) -> Result<ReserveOutcome, RepositoryError>;

    /// Return previously reserved stock. Compensation path for order-create
    /// failures after a successful reserve.
    async fn release(&self, demands: &[Reservation]) -> Result<(), RepositoryError>;
}

/// `PostgreSQL`-backed inventory store over [`ProductRepository`]. Owns a
/// pool handle so the store can outlive the request that built it.
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    /// Create an inventory store over the product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.pool)
    }
}

fn to_pairs(demands: &[Reservation]) -> Vec<(ProductId, i32)> {
    demands.iter().map(|r| (r.product_id, r.quantity)).collect()
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.repo().get(id).await
    }

    async fn reserve(&self, demands: &[Reservation]) -> Result<ReserveOutcome, RepositoryError> {
        self.repo().reserve(&to_pairs(demands)).await
    }

    async fn release(&self, demands: &[Reservation]) -> Result<(), RepositoryError> {
        self.repo().release(&to_pairs(demands)).await
    }
}

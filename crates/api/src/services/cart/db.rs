//! Persisted cart backend for logged-in shoppers.

use async_trait::async_trait;
use sqlx::PgPool;

use okra_core::{ProductId, UserId};

use super::{CartError, CartStore};
use crate::db::CartRepository;
use crate::models::{Cart, LineSnapshot};

/// Cart store backed by the `cart` / `cart_item` tables.
///
/// All mutations run inside [`CartRepository::mutate`], which locks the
/// owner's cart row for the duration of the read-modify-write. Owns a pool
/// handle so the store can outlive the request that built it.
pub struct DbCartStore {
    pool: PgPool,
    user_id: UserId,
}

impl DbCartStore {
    /// Create a store for one shopper's cart.
    #[must_use]
    pub const fn new(pool: PgPool, user_id: UserId) -> Self {
        Self { pool, user_id }
    }

    fn repo(&self) -> CartRepository<'_> {
        CartRepository::new(&self.pool)
    }
}

#[async_trait]
impl CartStore for DbCartStore {
    async fn read(&self) -> Result<Cart, CartError> {
        Ok(self.repo().read(self.user_id).await?)
    }

    async fn add_line(
        &self,
        snapshot: LineSnapshot,
        quantity: i32,
        size: Option<String>,
        color: Option<String>,
    ) -> Result<Cart, CartError> {
        self.repo()
            .mutate(self.user_id, |cart: &mut Cart| {
                cart.add_line(snapshot, quantity, size, color)
                    .map_err(CartError::from)
            })
            .await
    }

    async fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Cart, CartError> {
        self.repo()
            .mutate(self.user_id, |cart: &mut Cart| {
                cart.update_quantity(product_id, quantity)
                    .map_err(CartError::from)
            })
            .await
    }

    async fn remove(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.repo()
            .mutate(self.user_id, |cart: &mut Cart| {
                cart.remove(product_id).map_err(CartError::from)
            })
            .await
    }

    async fn clear(&self) -> Result<Cart, CartError> {
        self.repo()
            .mutate(self.user_id, |cart: &mut Cart| {
                cart.clear();
                Ok(())
            })
            .await
    }
}

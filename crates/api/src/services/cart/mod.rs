//! Cart storage backends.
//!
//! Two backends implement [`CartStore`]: [`DbCartStore`] persists a
//! logged-in shopper's cart in `PostgreSQL`, [`SessionCartStore`] keeps a
//! guest's cart in the session. Both apply the merge rules from
//! `models::Cart`, so behavior is identical regardless of where the lines
//! live.

mod db;
mod session;

pub use db::DbCartStore;
pub use session::SessionCartStore;

use async_trait::async_trait;
use thiserror::Error;

use okra_core::ProductId;

use crate::db::RepositoryError;
use crate::error::ApiError;
use crate::models::{Cart, CartModelError, LineSnapshot};

/// Errors from cart store operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The mutation itself was invalid.
    #[error(transparent)]
    Model(#[from] CartModelError),

    /// Database failure in the persisted backend.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Session failure in the ephemeral backend.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Model(CartModelError::LineNotFound) => Self::NotFound("Cart item".into()),
            CartError::Model(model) => Self::Validation(model.to_string()),
            CartError::Repository(repo) => Self::Database(repo),
            CartError::Session(session) => Self::Session(session),
        }
    }
}

/// Uniform interface over the persisted and session cart backends.
///
/// Every mutation returns the cart as it stands after the change, so
/// handlers can respond with the updated state in one round trip.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The current cart contents. Empty cart if nothing was ever added.
    async fn read(&self) -> Result<Cart, CartError>;

    /// Add units of a product variant, merging into an existing line for the
    /// same (product, size, color).
    async fn add_line(
        &self,
        snapshot: LineSnapshot,
        quantity: i32,
        size: Option<String>,
        color: Option<String>,
    ) -> Result<Cart, CartError>;

    /// Set the quantity of the line for `product_id`.
    async fn update_quantity(&self, product_id: ProductId, quantity: i32)
    -> Result<Cart, CartError>;

    /// Remove the line for `product_id`.
    async fn remove(&self, product_id: ProductId) -> Result<Cart, CartError>;

    /// Drop all lines.
    async fn clear(&self) -> Result<Cart, CartError>;
}

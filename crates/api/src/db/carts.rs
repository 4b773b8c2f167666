//! Persisted per-user cart repository.
//!
//! Every mutation locks the owner's cart row (`SELECT ... FOR UPDATE`),
//! applies the shared merge logic from `models::Cart`, and rewrites the
//! line rows inside the same transaction. Concurrent adds for one owner
//! therefore serialize and never lose quantity increments.

use sqlx::PgPool;

use okra_core::{Price, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Cart, CartItem};

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: i32,
    name: String,
    unit_price_minor: i64,
    quantity: i32,
    size: Option<String>,
    color: Option<String>,
    image_url: Option<String>,
    line_total_minor: i64,
}

impl CartItemRow {
    fn into_model(self) -> Result<CartItem, RepositoryError> {
        let bad_price =
            |e| RepositoryError::DataCorruption(format!("invalid price in database: {e}"));
        Ok(CartItem {
            product_id: ProductId::new(self.product_id),
            name: self.name,
            unit_price: Price::from_minor(self.unit_price_minor).map_err(bad_price)?,
            quantity: self.quantity,
            size: self.size,
            color: self.color,
            image_url: self.image_url,
            line_total: Price::from_minor(self.line_total_minor).map_err(bad_price)?,
        })
    }
}

/// Repository for persisted user carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Read the user's cart without locking. Returns an empty cart if the
    /// user never added anything.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn read(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            "SELECT ci.product_id, ci.name, ci.unit_price_minor, ci.quantity, \
                    ci.size, ci.color, ci.image_url, ci.line_total_minor \
             FROM cart_item ci \
             JOIN cart c ON c.id = ci.cart_id \
             WHERE c.user_id = $1 \
             ORDER BY ci.id",
        )
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(CartItemRow::into_model)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Cart { items })
    }

    /// Load the user's cart under a row lock, apply `mutate`, and write the
    /// result back, all in one transaction.
    ///
    /// The cart row is created on first use. `mutate` runs on the shared
    /// `models::Cart` so both backends enforce identical merge rules.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `mutate` unchanged; database failures
    /// roll the transaction back.
    pub async fn mutate<F, E>(&self, user_id: UserId, mutate: F) -> Result<Cart, E>
    where
        F: FnOnce(&mut Cart) -> Result<(), E>,
        E: From<RepositoryError>,
    {
        let db = |e: sqlx::Error| E::from(RepositoryError::Database(e));

        let mut tx = self.pool.begin().await.map_err(db)?;

        // Upsert-then-lock keeps first-add and concurrent-add on the same
        // serialization path.
        let (cart_id,): (i32,) = sqlx::query_as(
            "INSERT INTO cart (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO UPDATE SET updated_at = now() \
             RETURNING id",
        )
        .bind(user_id.as_i32())
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;

        sqlx::query("SELECT id FROM cart WHERE id = $1 FOR UPDATE")
            .bind(cart_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        let rows: Vec<CartItemRow> = sqlx::query_as(
            "SELECT product_id, name, unit_price_minor, quantity, \
                    size, color, image_url, line_total_minor \
             FROM cart_item WHERE cart_id = $1 ORDER BY id",
        )
        .bind(cart_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;

        let items = rows
            .into_iter()
            .map(CartItemRow::into_model)
            .collect::<Result<Vec<_>, _>>()
            .map_err(E::from)?;
        let mut cart = Cart { items };

        mutate(&mut cart)?;

        sqlx::query("DELETE FROM cart_item WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        for item in &cart.items {
            sqlx::query(
                "INSERT INTO cart_item \
                     (cart_id, product_id, name, unit_price_minor, quantity, \
                      size, color, image_url, line_total_minor) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(cart_id)
            .bind(item.product_id.as_i32())
            .bind(&item.name)
            .bind(item.unit_price.minor_units())
            .bind(item.quantity)
            .bind(&item.size)
            .bind(&item.color)
            .bind(&item.image_url)
            .bind(item.line_total.minor_units())
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        sqlx::query("UPDATE cart SET updated_at = now() WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        tx.commit().await.map_err(db)?;
        Ok(cart)
    }
}

//! Product catalog repository.
//!
//! Stock is only ever decremented through [`ProductRepository::reserve`],
//! an all-or-nothing transaction of conditional decrements. A plain
//! read-then-write would let two concurrent checkouts both pass the stock
//! check and oversell; `WHERE quantity >= $n` makes the decrement and the
//! check one atomic statement.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use okra_core::{AdminId, Price, ProductId};

use super::RepositoryError;
use crate::models::Product;

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    admin_id: i32,
    name: String,
    description: String,
    quantity: i32,
    price_minor: i64,
    sizes: Vec<String>,
    colors: Vec<String>,
    images: Vec<String>,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_model(self) -> Result<Product, RepositoryError> {
        let price = Price::from_minor(self.price_minor).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;
        Ok(Product {
            id: ProductId::new(self.id),
            admin_id: AdminId::new(self.admin_id),
            name: self.name,
            description: self.description,
            quantity: self.quantity,
            price,
            sizes: self.sizes,
            colors: self.colors,
            images: self.images,
            created_at: self.created_at,
        })
    }
}

const PRODUCT_COLUMNS: &str =
    "id, admin_id, name, description, quantity, price_minor, sizes, colors, images, created_at";

/// Fields for creating or updating a product.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub quantity: i32,
    pub price: Price,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
}

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Every demand was decremented; the transaction committed.
    Reserved,
    /// A product had too little stock; nothing was decremented.
    Short(ProductId),
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(ProductRow::into_model).transpose()
    }

    /// List the whole catalog, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ProductRow::into_model).collect()
    }

    /// List products created by one admin, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_admin(&self, admin_id: AdminId) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE admin_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(admin_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ProductRow::into_model).collect()
    }

    /// Create a product owned by `admin_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        admin_id: AdminId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO product \
                 (admin_id, name, description, quantity, price_minor, sizes, colors, images) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(admin_id.as_i32())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.quantity)
        .bind(input.price.minor_units())
        .bind(&input.sizes)
        .bind(&input.colors)
        .bind(&input.images)
        .fetch_one(self.pool)
        .await?;

        row.into_model()
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE product SET \
                 name = $2, description = $3, quantity = $4, price_minor = $5, \
                 sizes = $6, colors = $7, images = $8 \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.quantity)
        .bind(input.price.minor_units())
        .bind(&input.sizes)
        .bind(&input.colors)
        .bind(&input.images)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.into_model()
    }

    /// Hard-delete a product.
    ///
    /// Order history is unaffected (order items are snapshots), but the
    /// catalog reference from old carts dangles until the next read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let res = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Atomically reserve stock for every demand, all-or-nothing.
    ///
    /// Runs one transaction of conditional decrements
    /// (`quantity = quantity - n WHERE quantity >= n`). The first product
    /// with too little stock rolls the whole transaction back and is
    /// reported in `ReserveOutcome::Short`; no partial reservation survives.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn reserve(
        &self,
        demands: &[(ProductId, i32)],
    ) -> Result<ReserveOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for (product_id, quantity) in demands {
            let res = sqlx::query(
                "UPDATE product SET quantity = quantity - $2 \
                 WHERE id = $1 AND quantity >= $2",
            )
            .bind(product_id.as_i32())
            .bind(*quantity)
            .execute(&mut *tx)
            .await?;

            if res.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(ReserveOutcome::Short(*product_id));
            }
        }

        tx.commit().await?;
        Ok(ReserveOutcome::Reserved)
    }

    /// Return previously reserved stock (compensation for a failed
    /// order creation).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn release(&self, demands: &[(ProductId, i32)]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for (product_id, quantity) in demands {
            sqlx::query("UPDATE product SET quantity = quantity + $2 WHERE id = $1")
                .bind(product_id.as_i32())
                .bind(*quantity)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

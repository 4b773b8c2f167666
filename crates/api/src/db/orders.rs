//! Order ledger repository.
//!
//! Status writes are all conditional single statements (`WHERE` on the
//! current status), so the payment callback, user cancels, admin updates,
//! and the fulfillment sweep can race freely: whichever lands first wins and
//! the losers affect zero rows instead of clobbering state.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use okra_core::{
    DELIVER_AFTER_DAYS, GuestId, OrderId, OrderStatus, Owner, PaymentStatus, Price,
    ProductId, SHIP_AFTER_DAYS, UserId,
};

use super::RepositoryError;
use crate::models::{NewOrder, Order, OrderItem, ShippingAddress};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: Option<i32>,
    guest_id: Option<String>,
    total_minor: i64,
    payment_status: String,
    order_status: String,
    payment_reference: Option<String>,
    street: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_model(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let owner = match (self.user_id, self.guest_id) {
            (Some(user_id), None) => Owner::User(UserId::new(user_id)),
            (None, Some(guest_id)) => Owner::Guest(GuestId::from_string(guest_id)),
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "order {} must have exactly one owner",
                    self.id
                )));
            }
        };
        let corrupt = |e: String| RepositoryError::DataCorruption(e);

        Ok(Order {
            id: OrderId::new(self.id),
            owner,
            items,
            total_amount: Price::from_minor(self.total_minor)
                .map_err(|e| corrupt(format!("invalid total in database: {e}")))?,
            payment_status: PaymentStatus::from_str(&self.payment_status).map_err(corrupt)?,
            order_status: OrderStatus::from_str(&self.order_status).map_err(corrupt)?,
            payment_reference: self.payment_reference,
            shipping_address: ShippingAddress {
                street: self.street,
                city: self.city,
                state: self.state,
                postal_code: self.postal_code,
                country: self.country,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    product_id: i32,
    name: String,
    unit_price_minor: i64,
    quantity: i32,
    size: Option<String>,
    color: Option<String>,
}

impl OrderItemRow {
    fn into_model(self) -> Result<OrderItem, RepositoryError> {
        Ok(OrderItem {
            product_id: ProductId::new(self.product_id),
            name: self.name,
            unit_price: Price::from_minor(self.unit_price_minor).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
            })?,
            quantity: self.quantity,
            size: self.size,
            color: self.color,
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, guest_id, total_minor, payment_status, order_status, \
     payment_reference, street, city, state, postal_code, country, created_at, updated_at";

/// Counts from one fulfillment sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Orders promoted processing -> shipped.
    pub shipped: u64,
    /// Orders promoted shipped -> delivered.
    pub delivered: u64,
}

/// Repository for the order ledger.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new order with its item snapshot. Statuses start
    /// pending/pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails; nothing
    /// is written in that case.
    pub async fn create(&self, draft: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders \
                 (user_id, guest_id, total_minor, street, city, state, postal_code, country) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(draft.owner.user_id().map(|id| id.as_i32()))
        .bind(draft.owner.guest_id().map(GuestId::as_str))
        .bind(draft.total_amount.minor_units())
        .bind(&draft.shipping_address.street)
        .bind(&draft.shipping_address.city)
        .bind(&draft.shipping_address.state)
        .bind(&draft.shipping_address.postal_code)
        .bind(&draft.shipping_address.country)
        .fetch_one(&mut *tx)
        .await?;

        for item in &draft.items {
            sqlx::query(
                "INSERT INTO order_item \
                     (order_id, product_id, name, unit_price_minor, quantity, size, color) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(row.id)
            .bind(item.product_id.as_i32())
            .bind(&item.name)
            .bind(item.unit_price.minor_units())
            .bind(item.quantity)
            .bind(&item.size)
            .bind(&item.color)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        row.into_model(draft.items.clone())
    }

    /// Get one order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.as_i32())
                .fetch_optional(self.pool)
                .await?;

        let Some(row) = row else { return Ok(None) };

        let items: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT order_id, product_id, name, unit_price_minor, quantity, size, color \
             FROM order_item WHERE order_id = $1 ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(self.pool)
        .await?;

        let items = items
            .into_iter()
            .map(OrderItemRow::into_model)
            .collect::<Result<Vec<_>, _>>()?;
        row.into_model(items).map(Some)
    }

    /// List all orders of one owner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_owner(&self, owner: &Owner) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = match owner {
            Owner::User(user_id) => {
                sqlx::query_as(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(user_id.as_i32())
                .fetch_all(self.pool)
                .await?
            }
            Owner::Guest(guest_id) => {
                sqlx::query_as(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE guest_id = $1 \
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(guest_id.as_str())
                .fetch_all(self.pool)
                .await?
            }
        };

        self.attach_items(rows).await
    }

    /// List every order, newest first (admin view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT order_id, product_id, name, unit_price_minor, quantity, size, color \
             FROM order_item WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: std::collections::HashMap<i32, Vec<OrderItem>> =
            std::collections::HashMap::new();
        for item in item_rows {
            let order_id = item.order_id;
            by_order
                .entry(order_id)
                .or_default()
                .push(item.into_model()?);
        }

        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_model(items)
            })
            .collect()
    }

    /// Record the gateway transaction reference after payment initiation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_payment_reference(
        &self,
        id: OrderId,
        reference: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE orders SET payment_reference = $2, updated_at = now() WHERE id = $1")
            .bind(id.as_i32())
            .bind(reference)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Mark an order paid and move it to processing; a no-op when the
    /// payment is no longer pending (idempotent callback replay).
    ///
    /// Returns whether the transition was applied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn confirm_paid(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let res = sqlx::query(
            "UPDATE orders SET payment_status = 'paid', order_status = 'processing', \
                 updated_at = now() \
             WHERE id = $1 AND payment_status = 'pending'",
        )
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Mark a pending payment failed. Returns whether the transition was
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_payment_failed(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let res = sqlx::query(
            "UPDATE orders SET payment_status = 'failed', updated_at = now() \
             WHERE id = $1 AND payment_status = 'pending'",
        )
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Cancel an order, permitted only while fulfillment is still pending.
    /// Returns whether the transition was applied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn cancel(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let res = sqlx::query(
            "UPDATE orders SET order_status = 'cancelled', updated_at = now() \
             WHERE id = $1 AND order_status = 'pending'",
        )
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Advance fulfillment `from -> to` for one order. The conditional
    /// `WHERE` makes this safe against concurrent writers; callers validate
    /// the edge with `OrderStatus::can_advance_to` first.
    ///
    /// Returns whether the transition was applied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn advance(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let res = sqlx::query(
            "UPDATE orders SET order_status = $3, updated_at = now() \
             WHERE id = $1 AND order_status = $2",
        )
        .bind(id.as_i32())
        .bind(from.to_string())
        .bind(to.to_string())
        .execute(self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Delete an order and its items (admin tooling).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let res = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// One fulfillment sweep pass: promote paid orders that have sat
    /// unmodified past their cutoff.
    ///
    /// Both promotions are single conditional bulk updates, so a sweep is
    /// safe to run while a previous pass is still in flight and never
    /// touches orders another writer just moved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an update fails.
    pub async fn sweep_fulfillment(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SweepOutcome, RepositoryError> {
        let ship_cutoff = now - Duration::days(SHIP_AFTER_DAYS);
        let shipped = sqlx::query(
            "UPDATE orders SET order_status = 'shipped', updated_at = now() \
             WHERE order_status = 'processing' AND payment_status = 'paid' \
               AND updated_at <= $1",
        )
        .bind(ship_cutoff)
        .execute(self.pool)
        .await?
        .rows_affected();

        let deliver_cutoff = now - Duration::days(DELIVER_AFTER_DAYS);
        let delivered = sqlx::query(
            "UPDATE orders SET order_status = 'delivered', updated_at = now() \
             WHERE order_status = 'shipped' AND payment_status = 'paid' \
               AND updated_at <= $1",
        )
        .bind(deliver_cutoff)
        .execute(self.pool)
        .await?
        .rows_affected();

        Ok(SweepOutcome { shipped, delivered })
    }
}

//! Cart model and merge rules.
//!
//! Both cart backends (the persisted per-user cart and the session cart)
//! store a plain list of [`CartItem`]s and delegate every mutation to the
//! methods here, so the merge invariant - at most one line per
//! (product, size, color) - holds identically in both.

use serde::{Deserialize, Serialize};

use okra_core::{Price, PriceError, ProductId};

use super::product::Product;

/// One line in a cart: a chosen product variant with quantity and the unit
/// price captured when the line was first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    /// Product name at add time.
    pub name: String,
    /// Unit price captured at add time; later catalog edits don't touch it.
    pub unit_price: Price,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    /// Primary product image at add time.
    pub image_url: Option<String>,
    /// `unit_price * quantity`, recomputed on every merge/update.
    pub line_total: Price,
}

/// The product fields a cart line snapshots when it is created.
#[derive(Debug, Clone)]
pub struct LineSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub image_url: Option<String>,
}

impl LineSnapshot {
    /// Capture the current catalog state of a product.
    #[must_use]
    pub fn of(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            image_url: product.primary_image().map(ToOwned::to_owned),
        }
    }
}

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartModelError {
    /// Quantity must be at least 1.
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    /// No line for the given product.
    #[error("item not in cart")]
    LineNotFound,
    /// Line total arithmetic overflowed.
    #[error(transparent)]
    Price(#[from] PriceError),
}

/// A cart: an ordered sequence of line items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }

    /// Sum of all line totals.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the sum does not fit.
    pub fn total_amount(&self) -> Result<Price, PriceError> {
        self.items
            .iter()
            .try_fold(Price::ZERO, |acc, item| acc.checked_add(item.line_total))
    }

    /// Add `quantity` units of a product variant.
    ///
    /// If a line for the same (product, size, color) already exists, its
    /// quantity is incremented and the line total recomputed from the unit
    /// price captured when the line was first added. Otherwise a new line is
    /// appended snapshotting the product's current price, name, and image.
    ///
    /// # Errors
    ///
    /// Returns `CartModelError::InvalidQuantity` if `quantity < 1`.
    pub fn add_line(
        &mut self,
        snapshot: LineSnapshot,
        quantity: i32,
        size: Option<String>,
        color: Option<String>,
    ) -> Result<(), CartModelError> {
        if quantity < 1 {
            return Err(CartModelError::InvalidQuantity);
        }

        if let Some(line) = self.items.iter_mut().find(|l| {
            l.product_id == snapshot.product_id && l.size == size && l.color == color
        }) {
            line.quantity = line.quantity.saturating_add(quantity);
            line.line_total = line.unit_price.checked_mul(i64::from(line.quantity))?;
            return Ok(());
        }

        let line_total = snapshot.unit_price.checked_mul(i64::from(quantity))?;
        self.items.push(CartItem {
            product_id: snapshot.product_id,
            name: snapshot.name,
            unit_price: snapshot.unit_price,
            quantity,
            size,
            color,
            image_url: snapshot.image_url,
            line_total,
        });
        Ok(())
    }

    /// Set the quantity of the first line matching `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` if `quantity < 1`, `LineNotFound` if no line
    /// references the product.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), CartModelError> {
        if quantity < 1 {
            return Err(CartModelError::InvalidQuantity);
        }
        let line = self
            .items
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(CartModelError::LineNotFound)?;
        line.quantity = quantity;
        line.line_total = line.unit_price.checked_mul(i64::from(quantity))?;
        Ok(())
    }

    /// Remove every line referencing `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound` if no line references the product. The explicit
    /// 404 (rather than a silent no-op) surfaces client bugs.
    pub fn remove(&mut self, product_id: ProductId) -> Result<(), CartModelError> {
        let before = self.items.len();
        self.items.retain(|l| l.product_id != product_id);
        if self.items.len() == before {
            return Err(CartModelError::LineNotFound);
        }
        Ok(())
    }

    /// Drop all lines. Idempotent.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: i32, minor: i64) -> LineSnapshot {
        LineSnapshot {
            product_id: ProductId::new(id),
            name: format!("product-{id}"),
            unit_price: Price::from_minor(minor).expect("price"),
            image_url: None,
        }
    }

    #[test]
    fn test_duplicate_variant_merges_into_one_line() {
        let mut cart = Cart::empty();
        cart.add_line(snapshot(1, 500), 2, Some("M".into()), None)
            .expect("add");
        cart.add_line(snapshot(1, 500), 3, Some("M".into()), None)
            .expect("add");

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.items[0].line_total.minor_units(), 2500);
    }

    #[test]
    fn test_distinct_variants_stay_separate() {
        let mut cart = Cart::empty();
        cart.add_line(snapshot(1, 500), 1, Some("M".into()), None)
            .expect("add");
        cart.add_line(snapshot(1, 500), 1, Some("L".into()), None)
            .expect("add");

        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_merge_keeps_captured_price() {
        let mut cart = Cart::empty();
        cart.add_line(snapshot(1, 500), 1, None, None).expect("add");
        // Catalog price changed between adds; the merged line keeps the
        // price captured at first add.
        cart.add_line(snapshot(1, 999), 1, None, None).expect("add");

        assert_eq!(cart.items[0].unit_price.minor_units(), 500);
        assert_eq!(cart.items[0].line_total.minor_units(), 1000);
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = Cart::empty();
        assert_eq!(
            cart.add_line(snapshot(1, 500), 0, None, None),
            Err(CartModelError::InvalidQuantity)
        );
        assert_eq!(
            cart.add_line(snapshot(1, 500), -2, None, None),
            Err(CartModelError::InvalidQuantity)
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = Cart::empty();
        cart.add_line(snapshot(1, 500), 2, None, None).expect("add");
        cart.update_quantity(ProductId::new(1), 7).expect("update");

        assert_eq!(cart.items[0].quantity, 7);
        assert_eq!(cart.items[0].line_total.minor_units(), 3500);
        assert_eq!(
            cart.update_quantity(ProductId::new(1), 0),
            Err(CartModelError::InvalidQuantity)
        );
        assert_eq!(
            cart.update_quantity(ProductId::new(2), 1),
            Err(CartModelError::LineNotFound)
        );
    }

    #[test]
    fn test_remove_is_explicit_about_missing_lines() {
        let mut cart = Cart::empty();
        cart.add_line(snapshot(1, 500), 1, None, None).expect("add");

        assert!(cart.remove(ProductId::new(1)).is_ok());
        assert_eq!(
            cart.remove(ProductId::new(1)),
            Err(CartModelError::LineNotFound)
        );
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::empty();
        cart.add_line(snapshot(1, 500), 2, None, None).expect("add");
        cart.add_line(snapshot(2, 1000), 1, None, None).expect("add");

        assert_eq!(cart.total_amount().expect("total").minor_units(), 2000);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut cart = Cart::empty();
        cart.add_line(snapshot(1, 500), 1, None, None).expect("add");
        cart.clear();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_amount().expect("total"), Price::ZERO);
    }
}

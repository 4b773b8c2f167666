//! Order model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use okra_core::{OrderId, OrderStatus, Owner, PaymentStatus, Price, PriceError, ProductId};

use super::cart::CartItem;

/// One line of an order's item snapshot.
///
/// Frozen at order creation; later catalog changes never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price at the time the order was created.
    pub unit_price: Price,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            size: item.size.clone(),
            color: item.color.clone(),
        }
    }
}

/// A shipping address. Every field is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Validate that every field is non-blank.
    ///
    /// # Errors
    ///
    /// Returns the name of the first missing field.
    pub fn validate(&self) -> Result<(), &'static str> {
        for (name, value) in [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(name);
            }
        }
        Ok(())
    }
}

/// An order: an owner, an immutable item snapshot, and a status pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: Owner,
    pub items: Vec<OrderItem>,
    /// Sum of line totals, computed once at creation.
    pub total_amount: Price,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    /// Gateway transaction reference, set when payment is initiated.
    pub payment_reference: Option<String>,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether `owner` may read or cancel this order.
    #[must_use]
    pub fn owned_by(&self, owner: &Owner) -> bool {
        self.owner == *owner
    }
}

/// The data needed to create an order. Statuses always start pending/pending.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub owner: Owner,
    pub items: Vec<OrderItem>,
    pub total_amount: Price,
    pub shipping_address: ShippingAddress,
}

impl NewOrder {
    /// Snapshot a cart's items into an order draft.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the total does not fit.
    pub fn from_cart(
        owner: Owner,
        cart: &super::cart::Cart,
        shipping_address: ShippingAddress,
    ) -> Result<Self, PriceError> {
        Ok(Self {
            owner,
            items: cart.items.iter().map(OrderItem::from).collect(),
            total_amount: cart.total_amount()?,
            shipping_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cart::{Cart, LineSnapshot};
    use okra_core::GuestId;

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "12 Allen Avenue".to_owned(),
            city: "Ikeja".to_owned(),
            state: "Lagos".to_owned(),
            postal_code: "100001".to_owned(),
            country: "NG".to_owned(),
        }
    }

    #[test]
    fn test_address_validation() {
        assert!(address().validate().is_ok());

        let mut addr = address();
        addr.city = "  ".to_owned();
        assert_eq!(addr.validate(), Err("city"));
    }

    #[test]
    fn test_snapshot_from_cart() {
        let mut cart = Cart::empty();
        cart.add_line(
            LineSnapshot {
                product_id: ProductId::new(1),
                name: "P1".to_owned(),
                unit_price: Price::from_minor(500).expect("price"),
                image_url: None,
            },
            2,
            None,
            None,
        )
        .expect("add");

        let owner = Owner::Guest(GuestId::generate());
        let draft = NewOrder::from_cart(owner.clone(), &cart, address()).expect("draft");

        assert_eq!(draft.total_amount.minor_units(), 1000);
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].quantity, 2);
        assert_eq!(draft.owner, owner);
    }
}

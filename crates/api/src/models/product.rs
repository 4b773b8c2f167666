//! Product catalog model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use okra_core::{AdminId, Price, ProductId};

/// Maximum number of images a product may carry.
pub const MAX_PRODUCT_IMAGES: usize = 3;

/// A catalog product.
///
/// Created and owned by an admin. `quantity` is mutated only by checkout
/// reservation (atomic conditional decrement) and admin edits. Carts and
/// orders reference products but snapshot everything they need, so a product
/// row may be hard-deleted without breaking historical order reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// The admin who created the product; only they may edit or delete it.
    pub admin_id: AdminId,
    pub name: String,
    pub description: String,
    /// Units in stock. Never negative.
    pub quantity: i32,
    /// Unit price in minor currency units.
    pub price: Price,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    /// 1-3 image URLs; upload/storage happens outside this service.
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product can currently be purchased.
    #[must_use]
    pub const fn available(&self) -> bool {
        self.quantity > 0
    }

    /// The primary (first) image URL, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i32) -> Product {
        Product {
            id: ProductId::new(1),
            admin_id: AdminId::new(1),
            name: "Ankara tote".to_owned(),
            description: "Handmade tote bag".to_owned(),
            quantity,
            price: Price::from_minor(500).expect("price"),
            sizes: vec!["M".to_owned()],
            colors: vec![],
            images: vec!["https://cdn.example.com/tote.jpg".to_owned()],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_availability_derived_from_quantity() {
        assert!(product(1).available());
        assert!(!product(0).available());
    }

    #[test]
    fn test_primary_image() {
        assert_eq!(
            product(1).primary_image(),
            Some("https://cdn.example.com/tote.jpg")
        );
    }
}

//! Admin catalog management.
//!
//! Products belong to the admin who created them; update and delete are
//! refused for anyone else's products.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use okra_core::{Price, ProductId};

use crate::db::{ProductInput, ProductRepository};
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{CurrentIdentity, MAX_PRODUCT_IMAGES, Product};
use crate::state::AppState;

fn admin_id(identity: &CurrentIdentity) -> Result<okra_core::AdminId> {
    match identity {
        CurrentIdentity::Admin { id, .. } => Ok(*id),
        CurrentIdentity::User { .. } => {
            Err(ApiError::Forbidden("Only admins can manage products".into()))
        }
    }
}

/// Product fields as submitted by an admin. `price` is in major units.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub description: String,
    pub quantity: i32,
    pub price: Decimal,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ProductRequest {
    fn into_input(self) -> Result<ProductInput> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
        if self.quantity < 0 {
            return Err(ApiError::Validation("quantity must not be negative".into()));
        }
        if self.images.len() > MAX_PRODUCT_IMAGES {
            return Err(ApiError::Validation(format!(
                "at most {MAX_PRODUCT_IMAGES} images per product"
            )));
        }
        let price = Price::from_major(self.price)
            .map_err(|e| ApiError::Validation(format!("invalid price: {e}")))?;

        Ok(ProductInput {
            name: self.name,
            description: self.description,
            quantity: self.quantity,
            price,
            sizes: self.sizes,
            colors: self.colors,
            images: self.images,
        })
    }
}

/// The calling admin's products, newest first.
///
/// GET /api/admin/products
///
/// # Errors
///
/// 401/403 without an admin login.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(identity): RequireAdmin,
) -> Result<Json<Vec<Product>>> {
    let id = admin_id(&identity)?;
    let products = ProductRepository::new(state.pool()).list_by_admin(id).await?;
    Ok(Json(products))
}

/// Create a product owned by the calling admin.
///
/// POST /api/admin/products
///
/// # Errors
///
/// 400 on invalid fields.
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(identity): RequireAdmin,
    Json(req): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let id = admin_id(&identity)?;
    let input = req.into_input()?;
    let product = ProductRepository::new(state.pool()).create(id, &input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields. Only the owning admin may update it.
///
/// PUT /api/admin/products/{id}
///
/// # Errors
///
/// 404 for unknown products, 403 for another admin's product.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(identity): RequireAdmin,
    Path(id): Path<i32>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<Product>> {
    let caller = admin_id(&identity)?;
    let repo = ProductRepository::new(state.pool());

    let existing = repo
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Product".into()))?;
    if existing.admin_id != caller {
        return Err(ApiError::Forbidden(
            "This product belongs to another admin".into(),
        ));
    }

    let input = req.into_input()?;
    let product = repo.update(ProductId::new(id), &input).await?;
    Ok(Json(product))
}

/// Delete a product. Only the owning admin may delete it.
///
/// DELETE /api/admin/products/{id}
///
/// # Errors
///
/// 404 for unknown products, 403 for another admin's product.
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(identity): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let caller = admin_id(&identity)?;
    let repo = ProductRepository::new(state.pool());

    let existing = repo
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Product".into()))?;
    if existing.admin_id != caller {
        return Err(ApiError::Forbidden(
            "This product belongs to another admin".into(),
        ));
    }

    repo.delete(ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

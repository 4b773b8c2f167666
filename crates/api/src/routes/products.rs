//! Public catalog routes.

use axum::{
    Json,
    extract::{Path, State},
};

use okra_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{ApiError, Result};
use crate::models::Product;
use crate::state::AppState;

/// List the whole catalog, newest first.
///
/// GET /api/products
///
/// # Errors
///
/// 500 on database failure.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(products))
}

/// One product by id.
///
/// GET /api/products/{id}
///
/// # Errors
///
/// 404 for unknown ids.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Product".into()))?;
    Ok(Json(product))
}

//! Admin routes: admin registration, catalog management, order ledger.

pub mod orders;
pub mod products;

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::error::Result;
use crate::models::Admin;
use crate::services::AuthService;
use crate::state::AppState;

/// Request to register an admin account.
#[derive(Debug, Deserialize)]
pub struct RegisterAdminRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub state: Option<String>,
}

/// Register a new admin.
///
/// POST /api/admin
///
/// # Errors
///
/// 400 on invalid input, 409 if the email is already registered.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterAdminRequest>,
) -> Result<(StatusCode, Json<Admin>)> {
    let auth = AuthService::new(state.pool());
    let admin = auth
        .register_admin(
            &req.email,
            &req.password,
            &req.first_name,
            &req.last_name,
            req.state.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(admin)))
}

//! Account routes: registration, login, logout, profile.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use okra_core::Email;

use crate::db::UserRepository;
use crate::error::{ApiError, Result};
use crate::middleware::{RequireUser, clear_identity, set_identity};
use crate::models::{CurrentIdentity, User};
use crate::services::AuthService;
use crate::state::AppState;

/// Request to register a shopper account.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub state: Option<String>,
}

/// Register a new shopper.
///
/// POST /api/users
///
/// # Errors
///
/// 400 on invalid input, 409 if the email is already registered.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let auth = AuthService::new(state.pool());
    let user = auth
        .register_user(
            &req.email,
            &req.password,
            &req.first_name,
            &req.last_name,
            req.state.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Request to log in.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response to a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub identity: CurrentIdentity,
}

/// Login with email and password. Works for shoppers and admins; the
/// response's `kind` field says which matched.
///
/// POST /api/users/auth
///
/// # Errors
///
/// 401 on wrong credentials.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let auth = AuthService::new(state.pool());
    let account = auth.login(&req.email, &req.password).await?;

    let identity = account.identity();
    // Rotate the session id across the privilege change.
    session.cycle_id().await?;
    set_identity(&session, &identity).await?;

    Ok(Json(LoginResponse { identity }))
}

/// Log out, clearing the stored identity. The guest cart, if any, survives.
///
/// POST /api/users/logout
///
/// # Errors
///
/// 500 if the session cannot be modified.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_identity(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current shopper's profile.
///
/// GET /api/users/profile
///
/// # Errors
///
/// 401 without a shopper login.
pub async fn profile(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
) -> Result<Json<User>> {
    let CurrentIdentity::User { id, .. } = identity else {
        return Err(ApiError::Unauthorized("Shopper login required".into()));
    };

    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".into()))?;

    Ok(Json(user))
}

/// Partial profile update. Absent fields stay unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub state: Option<String>,
    pub password: Option<String>,
}

/// Update the current shopper's profile.
///
/// PUT /api/users/profile
///
/// # Errors
///
/// 400 on invalid email or weak password, 409 if the new email is taken.
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireUser(identity): RequireUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    let CurrentIdentity::User { id, .. } = identity else {
        return Err(ApiError::Unauthorized("Shopper login required".into()));
    };

    let email = req
        .email
        .as_deref()
        .map(Email::parse)
        .transpose()
        .map_err(|e| ApiError::Validation(format!("Invalid email: {e}")))?;

    let password_hash = req
        .password
        .as_deref()
        .map(|p| AuthService::new(state.pool()).hash_new_password(p))
        .transpose()?;

    let user = UserRepository::new(state.pool())
        .update_profile(
            id,
            email.as_ref(),
            req.first_name.as_deref(),
            req.last_name.as_deref(),
            req.state.as_deref(),
            password_hash.as_deref(),
        )
        .await?;

    // Keep the session's identity in step with an email change.
    set_identity(
        &session,
        &CurrentIdentity::User {
            id: user.id,
            email: user.email.clone(),
        },
    )
    .await?;

    Ok(Json(user))
}

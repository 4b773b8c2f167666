//! Authentication extractors for route handlers.
//!
//! The session carries a [`CurrentIdentity`] after login. `RequireUser` and
//! `RequireAdmin` reject with JSON errors; `OptionalIdentity` never rejects
//! and is used by the cart and checkout routes that serve guests too.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use okra_core::GuestId;

use crate::models::{CurrentIdentity, session_keys};

/// Extractor that requires a logged-in shopper.
///
/// Rejects with 401 when no identity is present and 403 when the session
/// holds an admin identity.
pub struct RequireUser(pub CurrentIdentity);

/// Extractor that requires a logged-in admin.
pub struct RequireAdmin(pub CurrentIdentity);

/// Extractor that reads the identity without rejecting.
pub struct OptionalIdentity(pub Option<CurrentIdentity>);

/// Rejection for the auth extractors.
pub enum AuthRejection {
    /// No identity in the session.
    Unauthorized,
    /// An identity is present but has the wrong role.
    Forbidden(&'static str),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Authentication required"})),
            )
                .into_response(),
            Self::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, Json(json!({"message": msg}))).into_response()
            }
        }
    }
}

async fn read_identity(parts: &mut Parts) -> Option<CurrentIdentity> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get(session_keys::CURRENT_IDENTITY)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = read_identity(parts)
            .await
            .ok_or(AuthRejection::Unauthorized)?;
        if identity.is_admin() {
            return Err(AuthRejection::Forbidden(
                "This endpoint is for shopper accounts",
            ));
        }
        Ok(Self(identity))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = read_identity(parts)
            .await
            .ok_or(AuthRejection::Unauthorized)?;
        if !identity.is_admin() {
            return Err(AuthRejection::Forbidden(
                "Only admins can access this resource",
            ));
        }
        Ok(Self(identity))
    }
}

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(read_identity(parts).await))
    }
}

/// Store the identity in the session after a successful login.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_identity(
    session: &Session,
    identity: &CurrentIdentity,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CURRENT_IDENTITY, identity)
        .await
}

/// Clear the identity from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_identity(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentIdentity>(session_keys::CURRENT_IDENTITY)
        .await?;
    Ok(())
}

/// The guest id for this session, minting and persisting one on first use.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn current_guest_id(
    session: &Session,
) -> Result<GuestId, tower_sessions::session::Error> {
    if let Some(existing) = session.get::<GuestId>(session_keys::GUEST_ID).await? {
        return Ok(existing);
    }
    let minted = GuestId::generate();
    session.insert(session_keys::GUEST_ID, &minted).await?;
    Ok(minted)
}

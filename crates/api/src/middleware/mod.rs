//! Middleware: session layer and authentication extractors.

pub mod auth;
pub mod session;

pub use auth::{
    OptionalIdentity, RequireAdmin, RequireUser, clear_identity, current_guest_id, set_identity,
};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};

//! Session-stored values and their keys.

use serde::{Deserialize, Serialize};

use okra_core::{AdminId, Email, UserId};

/// Keys for values stored in the session.
pub mod session_keys {
    /// The logged-in identity ([`super::CurrentIdentity`]).
    pub const CURRENT_IDENTITY: &str = "current_identity";

    /// The guest's cart lines (`models::Cart`). Ephemeral by design: lost
    /// when the session expires.
    pub const GUEST_CART: &str = "guest_cart";

    /// The guest ID minted at first guest checkout (`GuestId`). Correlates
    /// session carts with the orders they produced.
    pub const GUEST_ID: &str = "guest_id";
}

/// The identity stored in the session after login.
///
/// One login endpoint authenticates both shoppers and admins, so the session
/// carries which table the account came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurrentIdentity {
    User { id: UserId, email: Email },
    Admin { id: AdminId, email: Email },
}

impl CurrentIdentity {
    /// Whether this identity is an admin.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin { .. })
    }

    /// The identity's email address.
    #[must_use]
    pub const fn email(&self) -> &Email {
        match self {
            Self::User { email, .. } | Self::Admin { email, .. } => email,
        }
    }
}

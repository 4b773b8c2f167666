//! Cart/order ownership.

use serde::{Deserialize, Serialize};

use super::id::{GuestId, UserId};

/// Who a cart or order belongs to.
///
/// Exactly one of the two arms applies; an order row stores either a user ID
/// or a guest ID, never both. Guests are correlated across requests only by
/// the guest ID minted into their session at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    /// An authenticated account.
    User(UserId),
    /// An anonymous shopper, keyed by session guest ID.
    Guest(GuestId),
}

impl Owner {
    /// The user ID, if this owner is an authenticated account.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }

    /// The guest ID, if this owner is an anonymous shopper.
    #[must_use]
    pub const fn guest_id(&self) -> Option<&GuestId> {
        match self {
            Self::Guest(id) => Some(id),
            Self::User(_) => None,
        }
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Guest(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_exclusivity() {
        let user = Owner::User(UserId::new(1));
        assert!(user.user_id().is_some());
        assert!(user.guest_id().is_none());

        let guest = Owner::Guest(GuestId::generate());
        assert!(guest.user_id().is_none());
        assert!(guest.guest_id().is_some());
    }
}

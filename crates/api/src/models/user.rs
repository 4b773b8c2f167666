//! User and admin account models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use okra_core::{AdminId, Email, UserId};

/// A shopper account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// Free-form region field from registration.
    pub state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An admin account. Admins manage the catalog and the order ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub state: Option<String>,
    pub created_at: DateTime<Utc>,
}

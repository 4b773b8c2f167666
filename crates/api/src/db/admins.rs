//! Admin account repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use okra_core::{AdminId, Email};

use super::{RepositoryError, is_unique_violation};
use crate::models::Admin;

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: i32,
    email: String,
    first_name: String,
    last_name: String,
    state: Option<String>,
    created_at: DateTime<Utc>,
}

impl AdminRow {
    fn into_model(self) -> Result<Admin, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Admin {
            id: AdminId::new(self.id),
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            state: self.state,
            created_at: self.created_at,
        })
    }
}

const ADMIN_COLUMNS: &str = "id, email, first_name, last_name, state, created_at";

/// Repository for admin database operations.
pub struct AdminRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRepository<'a> {
    /// Create a new admin repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an admin by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Admin>, RepositoryError> {
        let row: Option<AdminRow> = sqlx::query_as(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(AdminRow::into_model).transpose()
    }

    /// Get an admin by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AdminId) -> Result<Option<Admin>, RepositoryError> {
        let row: Option<AdminRow> = sqlx::query_as(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_user WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(AdminRow::into_model).transpose()
    }

    /// Get an admin and their password hash by email, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Admin, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            admin: AdminRow,
            password_hash: String,
        }

        let row: Option<Row> = sqlx::query_as(&format!(
            "SELECT {ADMIN_COLUMNS}, password_hash FROM admin_user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((r.admin.into_model()?, r.password_hash)))
            .transpose()
    }

    /// Create a new admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(
        &self,
        email: &Email,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        state: Option<&str>,
    ) -> Result<Admin, RepositoryError> {
        let row: AdminRow = sqlx::query_as(&format!(
            "INSERT INTO admin_user (email, password_hash, first_name, last_name, state) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(state)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Conflict("email already registered".to_owned())
            } else {
                RepositoryError::Database(e)
            }
        })?;

        row.into_model()
    }
}

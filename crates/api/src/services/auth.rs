//! Authentication service.
//!
//! Password registration and login for shoppers and admins. One login
//! entry point checks the user table first and falls back to the admin
//! table, so both account kinds share `POST /api/users/auth`.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::http::StatusCode;
use sqlx::PgPool;
use thiserror::Error;

use okra_core::Email;

use crate::db::{AdminRepository, RepositoryError, UserRepository};
use crate::models::{Admin, CurrentIdentity, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] okra_core::EmailError),

    /// Wrong password, or no account with that email.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered.
    #[error("account already exists")]
    AlreadyExists,

    /// Password too weak.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEmail(_) | Self::WeakPassword(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::Repository(_) | Self::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn client_message(&self) -> String {
        match self {
            Self::InvalidEmail(e) => format!("Invalid email: {e}"),
            Self::InvalidCredentials => "Invalid email or password".to_owned(),
            Self::AlreadyExists => "An account with this email already exists".to_owned(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::Repository(_) | Self::PasswordHash => "Internal server error".to_owned(),
        }
    }
}

/// The outcome of a login: the identity to store plus the account record.
pub enum Authenticated {
    User(User),
    Admin(Admin),
}

impl Authenticated {
    /// The identity to persist in the session.
    #[must_use]
    pub fn identity(&self) -> CurrentIdentity {
        match self {
            Self::User(user) => CurrentIdentity::User {
                id: user.id,
                email: user.email.clone(),
            },
            Self::Admin(admin) => CurrentIdentity::Admin {
                id: admin.id,
                email: admin.email.clone(),
            },
        }
    }
}

/// Authentication service over the user and admin repositories.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    admins: AdminRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            admins: AdminRepository::new(pool),
        }
    }

    /// Register a new shopper account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::WeakPassword` on bad
    /// input, `AuthError::AlreadyExists` if the email is taken.
    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        state: Option<&str>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.users
            .create(&email, &password_hash, first_name, last_name, state)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::AlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Register a new admin account.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::register_user`].
    pub async fn register_admin(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        state: Option<&str>,
    ) -> Result<Admin, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.admins
            .create(&email, &password_hash, first_name, last_name, state)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::AlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password, checking shoppers first, then admins.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when no account matches or the
    /// password is wrong. The same error covers both cases so a caller cannot
    /// probe which emails are registered.
    pub async fn login(&self, email: &str, password: &str) -> Result<Authenticated, AuthError> {
        let email = Email::parse(email)?;

        if let Some((user, hash)) = self.users.get_with_password_hash(&email).await? {
            verify_password(password, &hash)?;
            return Ok(Authenticated::User(user));
        }

        if let Some((admin, hash)) = self.admins.get_with_password_hash(&email).await? {
            verify_password(password, &hash)?;
            return Ok(Authenticated::Admin(admin));
        }

        Err(AuthError::InvalidCredentials)
    }

    /// Hash a password for storage, validating strength first.
    ///
    /// Used by profile updates that change the password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` or `AuthError::PasswordHash`.
    pub fn hash_new_password(&self, password: &str) -> Result<String, AuthError> {
        validate_password(password)?;
        hash_password(password)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}

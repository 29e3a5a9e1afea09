//! Domain service for authentication and role management.
//!
//! Handles signup, credential checks and promote/demote. Session state is
//! kept by the HTTP layer; this service only decides *who* the caller is.

use thiserror::Error;

use crate::models::user::{Identity, Role, User};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Wrong password and unknown email both end up here.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Store error: {0}")]
    Store(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(format!("{err:#}"))
    }
}

/// Signup form contents.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a `user`-role account and returns its identity snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for malformed input and
    /// [`AuthError::Conflict`] if the email is already registered.
    async fn register(&self, registration: Registration) -> Result<Identity, AuthError>;

    /// Verifies credentials and returns the identity snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email or a
    /// wrong password, without saying which.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Fresh identity for an email, or `None` if the account is gone.
    async fn current_identity(&self, email: &str) -> Result<Option<Identity>, AuthError>;

    async fn list_users(&self, caller: &Identity) -> Result<Vec<User>, AuthError>;

    /// Sets `email`'s role. The caller must be an admin; this is checked
    /// before the store is touched.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Forbidden`] for a non-admin caller and
    /// [`AuthError::NotFound`] for an unknown email.
    async fn set_role(&self, caller: &Identity, email: &str, role: Role)
    -> Result<User, AuthError>;

    async fn promote(&self, caller: &Identity, email: &str) -> Result<User, AuthError> {
        self.set_role(caller, email, Role::Admin).await
    }

    async fn demote(&self, caller: &Identity, email: &str) -> Result<User, AuthError> {
        self.set_role(caller, email, Role::User).await
    }
}

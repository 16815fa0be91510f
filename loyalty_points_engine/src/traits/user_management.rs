use async_trait::async_trait;
use thiserror::Error;

use crate::db_types::User;

#[derive(Debug, Clone, Error)]
pub enum UserApiError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Login is already taken")]
    LoginUnavailable,
}

/// User records are created on registration and never mutated afterwards.
#[async_trait]
pub trait UserManagement: Send + Sync {
    async fn fetch_user(&self, id: i64) -> Result<Option<User>, UserApiError>;

    /// Lookup by login. Logins are case-folded before they are stored or compared.
    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, UserApiError>;

    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, UserApiError>;

    /// Deletes the user. [`UserApiError::UserNotFound`] when no such user exists.
    async fn delete_user(&self, id: i64) -> Result<(), UserApiError>;
}

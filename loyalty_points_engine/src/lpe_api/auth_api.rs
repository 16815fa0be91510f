use std::fmt::Debug;

use crate::{
    db_types::User,
    traits::{UserApiError, UserManagement},
};

/// User registration and lookup for the authentication flow. Password hashing happens at the
/// edge; this API only ever sees opaque hashes.
pub struct AuthApi<B> {
    db: B,
}

impl<B> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi")
    }
}

impl<B> AuthApi<B>
where B: UserManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Registers a new user. The login must be unused.
    pub async fn register_user(&self, login: &str, password_hash: &str) -> Result<User, UserApiError> {
        if self.db.fetch_user_by_login(login).await?.is_some() {
            return Err(UserApiError::LoginUnavailable);
        }
        self.db.create_user(login, password_hash).await
    }

    pub async fn user_by_login(&self, login: &str) -> Result<Option<User>, UserApiError> {
        self.db.fetch_user_by_login(login).await
    }
}

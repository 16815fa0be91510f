use log::debug;
use sqlx::PgConnection;

use super::is_unique_violation;
use crate::{db_types::User, traits::UserApiError};

pub async fn fetch_user(id: i64, conn: &mut PgConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT id, login, password FROM users WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_user_by_login(login: &str, conn: &mut PgConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT id, login, password FROM users WHERE login = $1")
        .bind(login.to_lowercase())
        .fetch_optional(conn)
        .await
}

pub async fn create_user(login: &str, password_hash: &str, conn: &mut PgConnection) -> Result<User, UserApiError> {
    let login = login.to_lowercase();
    let user: User = sqlx::query_as("INSERT INTO users (login, password) VALUES ($1, $2) RETURNING id, login, password")
        .bind(&login)
        .bind(password_hash)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                UserApiError::LoginUnavailable
            } else {
                UserApiError::DatabaseError(e.to_string())
            }
        })?;
    debug!("👤️ User [{login}] registered with id {}", user.id);
    Ok(user)
}

pub async fn delete_user(id: i64, conn: &mut PgConnection) -> Result<(), UserApiError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .map_err(|e| UserApiError::DatabaseError(e.to_string()))?;
    if result.rows_affected() == 0 {
        return Err(UserApiError::UserNotFound(id));
    }
    Ok(())
}

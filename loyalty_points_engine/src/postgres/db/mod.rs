//! Low-level Postgres access.
//!
//! All interactions are plain functions taking a `&mut PgConnection`, so callers can run them on
//! a pooled connection or inside a transaction without any other changes.
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, PgPool};

pub mod balance;
pub mod orders;
pub mod users;

const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_CHECK_VIOLATION: &str = "23514";

pub async fn new_pool(url: &str, max_connections: u32) -> Result<PgPool, SqlxError> {
    PgPoolOptions::new().max_connections(max_connections).connect(url).await
}

// The only place where Postgres error codes are interpreted; everything above this layer deals in
// domain sentinels.
pub(crate) fn is_unique_violation(err: &SqlxError) -> bool {
    matches!(err, SqlxError::Database(db) if db.code().as_deref() == Some(PG_UNIQUE_VIOLATION))
}

pub(crate) fn is_check_violation(err: &SqlxError) -> bool {
    matches!(err, SqlxError::Database(db) if db.code().as_deref() == Some(PG_CHECK_VIOLATION))
}

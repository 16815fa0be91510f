use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::is_check_violation;
use crate::{
    db_types::{Balance, OrderNumber, Withdrawal},
    traits::BalanceApiError,
};

pub async fn fetch_balance(user_id: i64, conn: &mut PgConnection) -> Result<Balance, BalanceApiError> {
    let row: Option<(f64, DateTime<Utc>, f64)> = sqlx::query_as(
        r#"
        SELECT
            balance,
            updated,
            (
                SELECT COALESCE(SUM(w.value), 0)
                FROM withdrawals w
                WHERE w.user_id = $1
            ) AS total_withdrawn
        FROM loyalty_points
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| BalanceApiError::DatabaseError(e.to_string()))?;
    row.map(|(balance, updated, total_withdrawn)| Balance { user_id, balance, total_withdrawn, updated })
        .ok_or(BalanceApiError::BalanceNotFound(user_id))
}

/// Adds an accrual to the user's balance, creating the row on the first credit. Negative accruals
/// are stored as zero. Returns the new balance together with the current total withdrawn.
pub async fn credit(accrual: f64, user_id: i64, conn: &mut PgConnection) -> Result<Balance, BalanceApiError> {
    let accrual = accrual.max(0.0);
    let row: (f64, DateTime<Utc>, f64) = sqlx::query_as(
        r#"
        WITH new_balance AS (
            INSERT INTO loyalty_points (user_id, balance, updated)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id)
            DO UPDATE SET
                balance = loyalty_points.balance + $2,
                updated = now()
            RETURNING balance, updated
        )
        SELECT
            balance,
            updated,
            (
                SELECT COALESCE(SUM(w.value), 0)
                FROM withdrawals w
                WHERE w.user_id = $1
            ) AS total_withdrawn
        FROM new_balance
        "#,
    )
    .bind(user_id)
    .bind(accrual)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_check_violation(&e) {
            BalanceApiError::NegativeBalance
        } else {
            BalanceApiError::DatabaseError(e.to_string())
        }
    })?;
    Ok(Balance { user_id, balance: row.0, total_withdrawn: row.2, updated: row.1 })
}

/// Debit half of a withdrawal. Runs inside the caller's transaction together with
/// [`record_withdrawal`]; the check constraint rejecting an overdraft surfaces here.
pub async fn debit(sum: f64, user_id: i64, conn: &mut PgConnection) -> Result<(), BalanceApiError> {
    sqlx::query("UPDATE loyalty_points SET balance = balance - $1, updated = now() WHERE user_id = $2")
        .bind(sum)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(|e| {
            if is_check_violation(&e) {
                BalanceApiError::NegativeBalance
            } else {
                BalanceApiError::DatabaseError(e.to_string())
            }
        })?;
    Ok(())
}

pub async fn record_withdrawal(
    id: Uuid,
    sum: f64,
    user_id: i64,
    order_number: &OrderNumber,
    conn: &mut PgConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO withdrawals (id, user_id, order_number, value, processed_at) VALUES ($1, $2, $3, $4, now())")
        .bind(id)
        .bind(user_id)
        .bind(order_number)
        .bind(sum)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn withdrawals_for_user(user_id: i64, conn: &mut PgConnection) -> Result<Vec<Withdrawal>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, order_number, value, processed_at
        FROM withdrawals
        WHERE user_id = $1
        ORDER BY processed_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

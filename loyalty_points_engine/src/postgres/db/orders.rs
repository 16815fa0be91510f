use chrono::{DateTime, Utc};
use log::debug;
use sqlx::PgConnection;

use super::is_unique_violation;
use crate::{
    db_types::{Order, OrderNumber, OrderStatus},
    traits::OrderApiError,
};

pub async fn fetch_order(number: &OrderNumber, conn: &mut PgConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT id, user_id, uploaded_at, status, accrual, processed_at FROM orders WHERE id = $1")
        .bind(number)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut PgConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, user_id, uploaded_at, status, accrual, processed_at
        FROM orders
        WHERE user_id = $1
        ORDER BY uploaded_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

pub async fn fetch_orders_by_status(status: OrderStatus, conn: &mut PgConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, user_id, uploaded_at, status, accrual, processed_at
        FROM orders
        WHERE status = $1
        ORDER BY uploaded_at ASC
        "#,
    )
    .bind(status.to_string())
    .fetch_all(conn)
    .await
}

pub async fn insert_order(order: &Order, conn: &mut PgConnection) -> Result<(), OrderApiError> {
    sqlx::query("INSERT INTO orders (id, user_id, status) VALUES ($1, $2, $3)")
        .bind(&order.number)
        .bind(order.user_id)
        .bind(order.status.to_string())
        .execute(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                OrderApiError::DuplicateOrder(order.number.clone())
            } else {
                OrderApiError::DatabaseError(e.to_string())
            }
        })?;
    debug!("📦️ Order [{}] saved with status {}", order.number, order.status);
    Ok(())
}

/// Single UPDATE writing the terminal status, the accrual and a fresh `processed_at`, which is
/// also returned.
pub async fn set_processed_status(
    number: &OrderNumber,
    status: OrderStatus,
    accrual: f64,
    conn: &mut PgConnection,
) -> Result<DateTime<Utc>, sqlx::Error> {
    let processed_at = Utc::now();
    sqlx::query("UPDATE orders SET status = $2, accrual = $3, processed_at = $4 WHERE id = $1")
        .bind(number)
        .bind(status.to_string())
        .bind(accrual)
        .bind(processed_at)
        .execute(conn)
        .await?;
    Ok(processed_at)
}

/// The most recently uploaded order number, or "0" when the table is empty.
pub async fn last_order_number(conn: &mut PgConnection) -> Result<OrderNumber, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT id FROM orders ORDER BY uploaded_at DESC LIMIT 1").fetch_optional(conn).await?;
    Ok(row.map(|(id,)| OrderNumber(id)).unwrap_or_else(|| OrderNumber::from("0")))
}

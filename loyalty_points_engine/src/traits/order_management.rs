use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{Order, OrderNumber, OrderStatus};

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("Order {0} already exists")]
    DuplicateOrder(OrderNumber),
    #[error("Order {0} has already been uploaded by another user")]
    OwnedByAnotherUser(OrderNumber),
}

/// Order storage. Orders are inserted with status NEW and mutated exactly once, into a terminal
/// status together with their accrual value and processing timestamp.
#[async_trait]
pub trait OrderManagement: Send + Sync {
    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, OrderApiError>;

    /// All orders of the user, oldest upload first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderApiError>;

    async fn fetch_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderApiError>;

    /// Inserts a NEW order. An empty order number asks the backend to mint the next generated
    /// one. A second insert of the same number yields [`OrderApiError::DuplicateOrder`].
    async fn insert_order(&self, order: Order) -> Result<(), OrderApiError>;

    /// Writes the terminal status and accrual, stamping and returning a fresh `processed_at`.
    async fn set_processed_status(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: f64,
    ) -> Result<DateTime<Utc>, OrderApiError>;

    /// The most recently uploaded order number, or "0" when no orders exist yet. Seeds the order
    /// number generator.
    async fn last_order_number(&self) -> Result<OrderNumber, OrderApiError>;
}

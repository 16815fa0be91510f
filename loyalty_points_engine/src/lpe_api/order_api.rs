use std::fmt::Debug;

use log::debug;

use crate::{
    db_types::{Order, OrderNumber},
    traits::{OrderApiError, OrderManagement},
};

/// Outcome of an order upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSubmission {
    /// A NEW row was created; the order should be handed to the accrual poller.
    Accepted,
    /// The same user uploaded this number before. Nothing changed.
    AlreadyUploaded,
}

pub struct OrderApi<B> {
    db: B,
}

impl<B> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi")
    }
}

impl<B> OrderApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Uploads an order number for the user. A number already taken by another user yields
    /// [`OrderApiError::OwnedByAnotherUser`]; once assigned, a number is never transferred.
    pub async fn submit_order(&self, number: OrderNumber, user_id: i64) -> Result<OrderSubmission, OrderApiError> {
        if let Some(existing) = self.db.fetch_order(&number).await? {
            return if existing.user_id == user_id {
                debug!("📦️ Order [{number}] was already uploaded by user {user_id}");
                Ok(OrderSubmission::AlreadyUploaded)
            } else {
                Err(OrderApiError::OwnedByAnotherUser(number))
            };
        }
        self.db.insert_order(Order::new(number, user_id)).await?;
        Ok(OrderSubmission::Accepted)
    }

    /// All orders of the user, oldest upload first.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderApiError> {
        self.db.fetch_orders_for_user(user_id).await
    }
}

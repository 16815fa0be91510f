use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::db_types::{Order, OrderNumber};

/// In-memory index of orders currently being polled or awaiting a persistence retry.
///
/// Entries appear when an order is registered with the poller and disappear only after its
/// terminal state has been durably persisted (including the balance credit for processed orders).
/// The tracker is a soft cache: on a crash it is rebuilt from the NEW orders in storage.
#[derive(Debug, Default)]
pub struct OrdersTracker {
    orders: RwLock<HashMap<OrderNumber, Order>>,
}

impl OrdersTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, number: &OrderNumber) -> Option<Order> {
        self.orders.read().await.get(number).cloned()
    }

    pub async fn get_all(&self) -> Vec<Order> {
        self.orders.read().await.values().cloned().collect()
    }

    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.number.clone(), order);
    }

    pub async fn remove(&self, number: &OrderNumber) {
        self.orders.write().await.remove(number);
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::OrderStatus;

    #[tokio::test]
    async fn insert_get_remove() {
        let tracker = OrdersTracker::new();
        assert!(tracker.is_empty().await);

        let order = Order::new(OrderNumber::from("12345678903"), 1);
        tracker.insert(order.clone()).await;
        assert_eq!(tracker.get(&order.number).await.unwrap().user_id, 1);
        assert_eq!(tracker.get_all().await.len(), 1);

        tracker.remove(&order.number).await;
        assert!(tracker.get(&order.number).await.is_none());
        assert!(tracker.is_empty().await);
    }

    #[tokio::test]
    async fn insert_overwrites_existing_entry() {
        let tracker = OrdersTracker::new();
        let mut order = Order::new(OrderNumber::from("79927398713"), 2);
        tracker.insert(order.clone()).await;

        order.status = OrderStatus::Processed;
        order.accrual = 100.0;
        tracker.insert(order.clone()).await;

        let tracked = tracker.get(&order.number).await.unwrap();
        assert_eq!(tracked.status, OrderStatus::Processed);
        assert_eq!(tracked.accrual, 100.0);
        assert_eq!(tracker.get_all().await.len(), 1);
    }
}

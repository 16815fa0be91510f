use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loyalty_points_engine::{
    db_types::{Balance, Order, OrderNumber, OrderStatus, User, Withdrawal},
    traits::{
        AccrualRegistry,
        BalanceApiError,
        BalanceManagement,
        OrderApiError,
        OrderManagement,
        UserApiError,
        UserManagement,
    },
};
use mockall::mock;

mock! {
    pub UserStore {}

    #[async_trait]
    impl UserManagement for UserStore {
        async fn fetch_user(&self, id: i64) -> Result<Option<User>, UserApiError>;
        async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, UserApiError>;
        async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, UserApiError>;
        async fn delete_user(&self, id: i64) -> Result<(), UserApiError>;
    }
}

mock! {
    pub OrderStore {}

    #[async_trait]
    impl OrderManagement for OrderStore {
        async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, OrderApiError>;
        async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderApiError>;
        async fn fetch_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderApiError>;
        async fn insert_order(&self, order: Order) -> Result<(), OrderApiError>;
        async fn set_processed_status(
            &self,
            number: &OrderNumber,
            status: OrderStatus,
            accrual: f64,
        ) -> Result<DateTime<Utc>, OrderApiError>;
        async fn last_order_number(&self) -> Result<OrderNumber, OrderApiError>;
    }
}

mock! {
    pub BalanceStore {}

    #[async_trait]
    impl BalanceManagement for BalanceStore {
        async fn credit_balance(&self, accrual: f64, user_id: i64) -> Result<Balance, BalanceApiError>;
        async fn withdraw(&self, sum: f64, user_id: i64, order_number: &OrderNumber) -> Result<(), BalanceApiError>;
        async fn fetch_balance(&self, user_id: i64) -> Result<Balance, BalanceApiError>;
        async fn withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, BalanceApiError>;
    }
}

mock! {
    pub Registry {}

    #[async_trait]
    impl AccrualRegistry for Registry {
        async fn register_new_order(&self, number: OrderNumber) -> Result<(), OrderApiError>;
    }
}

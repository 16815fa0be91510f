//! `PostgresDatabase` is the concrete storage backend of the engine, implementing every trait in
//! [`crate::traits`] on top of a connection pool.
use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::db::{self, balance, orders, users};
use crate::{
    db_types::{Balance, Order, OrderNumber, OrderStatus, User, Withdrawal},
    generator::{GeneratorError, OrderNumberGenerator},
    traits::{
        BalanceApiError,
        BalanceManagement,
        OrderApiError,
        OrderManagement,
        UserApiError,
        UserManagement,
    },
};

#[derive(Debug, Error)]
pub enum DatabaseInitError {
    #[error("can't configure storage: {0}")]
    Connect(String),
    #[error("bad migrations run attempt: {0}")]
    Migrate(String),
    #[error("can't initialize order number generator: {0}")]
    Generator(#[from] GeneratorError),
}

#[derive(Clone)]
pub struct PostgresDatabase {
    url: String,
    pool: PgPool,
    numgen: Arc<OrderNumberGenerator>,
}

impl Debug for PostgresDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PostgresDatabase ({:?})", self.pool)
    }
}

impl PostgresDatabase {
    /// Connects to the database, applies pending migrations and seeds the order number generator
    /// from the most recently uploaded order. Any failure here is fatal for the process.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, DatabaseInitError> {
        let pool = db::new_pool(url, max_connections).await.map_err(|e| DatabaseInitError::Connect(e.to_string()))?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| DatabaseInitError::Migrate(e.to_string()))?;
        info!("🗃️ Database migrations are up to date");

        let mut conn = pool.acquire().await.map_err(|e| DatabaseInitError::Connect(e.to_string()))?;
        let seed = orders::last_order_number(&mut conn).await.map_err(|e| DatabaseInitError::Connect(e.to_string()))?;
        drop(conn);
        let numgen = OrderNumberGenerator::with_seed(seed.as_str())?;
        info!("🔢️ Order number generator seeded from [{seed}]");

        Ok(Self { url: url.to_string(), pool, numgen: Arc::new(numgen) })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Next number in the generated sequence. On counter exhaustion the incident is logged and
    /// the sequence restarts from "0".
    pub fn fresh_order_number(&self) -> OrderNumber {
        self.numgen.next_or_zero()
    }
}

fn user_db_err(e: sqlx::Error) -> UserApiError {
    UserApiError::DatabaseError(e.to_string())
}

fn order_db_err(e: sqlx::Error) -> OrderApiError {
    OrderApiError::DatabaseError(e.to_string())
}

fn balance_db_err(e: sqlx::Error) -> BalanceApiError {
    BalanceApiError::DatabaseError(e.to_string())
}

#[async_trait]
impl UserManagement for PostgresDatabase {
    async fn fetch_user(&self, id: i64) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await.map_err(user_db_err)?;
        users::fetch_user(id, &mut conn).await.map_err(user_db_err)
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await.map_err(user_db_err)?;
        users::fetch_user_by_login(login, &mut conn).await.map_err(user_db_err)
    }

    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, UserApiError> {
        let mut conn = self.pool.acquire().await.map_err(user_db_err)?;
        users::create_user(login, password_hash, &mut conn).await
    }

    async fn delete_user(&self, id: i64) -> Result<(), UserApiError> {
        let mut conn = self.pool.acquire().await.map_err(user_db_err)?;
        users::delete_user(id, &mut conn).await
    }
}

#[async_trait]
impl OrderManagement for PostgresDatabase {
    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await.map_err(order_db_err)?;
        orders::fetch_order(number, &mut conn).await.map_err(order_db_err)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await.map_err(order_db_err)?;
        orders::fetch_orders_for_user(user_id, &mut conn).await.map_err(order_db_err)
    }

    async fn fetch_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await.map_err(order_db_err)?;
        orders::fetch_orders_by_status(status, &mut conn).await.map_err(order_db_err)
    }

    async fn insert_order(&self, mut order: Order) -> Result<(), OrderApiError> {
        // an empty number asks for a server-minted one
        if order.number.as_str().is_empty() {
            order.number = self.fresh_order_number();
        }
        let mut conn = self.pool.acquire().await.map_err(order_db_err)?;
        orders::insert_order(&order, &mut conn).await
    }

    async fn set_processed_status(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: f64,
    ) -> Result<DateTime<Utc>, OrderApiError> {
        let mut conn = self.pool.acquire().await.map_err(order_db_err)?;
        orders::set_processed_status(number, status, accrual, &mut conn).await.map_err(order_db_err)
    }

    async fn last_order_number(&self) -> Result<OrderNumber, OrderApiError> {
        let mut conn = self.pool.acquire().await.map_err(order_db_err)?;
        orders::last_order_number(&mut conn).await.map_err(order_db_err)
    }
}

#[async_trait]
impl BalanceManagement for PostgresDatabase {
    async fn credit_balance(&self, accrual: f64, user_id: i64) -> Result<Balance, BalanceApiError> {
        let mut conn = self.pool.acquire().await.map_err(balance_db_err)?;
        balance::credit(accrual, user_id, &mut conn).await
    }

    async fn withdraw(&self, sum: f64, user_id: i64, order_number: &OrderNumber) -> Result<(), BalanceApiError> {
        let mut tx = self.pool.begin().await.map_err(balance_db_err)?;
        balance::debit(sum, user_id, &mut tx).await?;
        balance::record_withdrawal(Uuid::now_v7(), sum, user_id, order_number, &mut tx)
            .await
            .map_err(balance_db_err)?;
        tx.commit().await.map_err(balance_db_err)?;
        Ok(())
    }

    async fn fetch_balance(&self, user_id: i64) -> Result<Balance, BalanceApiError> {
        let mut conn = self.pool.acquire().await.map_err(balance_db_err)?;
        balance::fetch_balance(user_id, &mut conn).await
    }

    async fn withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, BalanceApiError> {
        let mut conn = self.pool.acquire().await.map_err(balance_db_err)?;
        balance::withdrawals_for_user(user_id, &mut conn).await.map_err(balance_db_err)
    }
}

use async_trait::async_trait;
use thiserror::Error;

use crate::db_types::{Balance, OrderNumber, Withdrawal};

#[derive(Debug, Clone, Error)]
pub enum BalanceApiError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("points balance value can't be negative")]
    NegativeBalance,
    #[error("No balance exists for user {0}")]
    BalanceNotFound(i64),
}

/// The balance engine. Every mutation is a single transactional unit and the database enforces
/// `balance >= 0` with a check constraint; [`BalanceApiError::NegativeBalance`] is the sentinel
/// for that constraint firing.
#[async_trait]
pub trait BalanceManagement: Send + Sync {
    /// Adds an accrual to the user's balance, creating the balance row on first credit. Negative
    /// accruals are normalized to zero. Returns the updated balance.
    async fn credit_balance(&self, accrual: f64, user_id: i64) -> Result<Balance, BalanceApiError>;

    /// Debits the balance and appends a withdrawal history record, atomically. `order_number` is
    /// the hypothetical order the user intends the withdrawal for.
    async fn withdraw(&self, sum: f64, user_id: i64, order_number: &OrderNumber) -> Result<(), BalanceApiError>;

    /// Current balance with total withdrawn. A user who has never been credited has no balance
    /// row, which reads as [`BalanceApiError::BalanceNotFound`].
    async fn fetch_balance(&self, user_id: i64) -> Result<Balance, BalanceApiError>;

    /// Withdrawal history, oldest first.
    async fn withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, BalanceApiError>;
}

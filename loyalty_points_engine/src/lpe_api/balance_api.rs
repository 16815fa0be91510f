use std::fmt::Debug;

use crate::{
    db_types::{Balance, OrderNumber, Withdrawal},
    traits::{BalanceApiError, BalanceManagement},
};

pub struct BalanceApi<B> {
    db: B,
}

impl<B> Debug for BalanceApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BalanceApi")
    }
}

impl<B> BalanceApi<B>
where B: BalanceManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Current balance for the user. Users who have never been credited get a zeroed balance.
    pub async fn balance(&self, user_id: i64) -> Result<Balance, BalanceApiError> {
        match self.db.fetch_balance(user_id).await {
            Ok(balance) => Ok(balance),
            Err(BalanceApiError::BalanceNotFound(_)) => Ok(Balance::empty(user_id)),
            Err(e) => Err(e),
        }
    }

    /// Debits the balance in favour of a (possibly hypothetical) order. The database check
    /// constraint is what ultimately rejects overdrafts.
    pub async fn withdraw(&self, sum: f64, user_id: i64, order_number: &OrderNumber) -> Result<(), BalanceApiError> {
        self.db.withdraw(sum, user_id, order_number).await
    }

    /// Withdrawal history, oldest first.
    pub async fn withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, BalanceApiError> {
        self.db.withdrawals(user_id).await
    }
}

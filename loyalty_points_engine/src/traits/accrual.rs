use async_trait::async_trait;
use thiserror::Error;

use crate::{
    db_types::{AccrualOrder, OrderNumber},
    retry::MaybeRetriable,
    traits::OrderApiError,
};

/// Failure of a single accrual lookup. `Retriable` covers everything that is expected to succeed
/// later: transport errors, rate limiting, the calculator not knowing the order yet, and 5xx.
/// `Failed` is everything else.
#[derive(Debug, Clone, Error)]
pub enum AccrualError {
    #[error("retriable accrual request failure: {0}")]
    Retriable(String),
    #[error("accrual request failed: {0}")]
    Failed(String),
}

impl MaybeRetriable for AccrualError {
    fn is_retriable(&self) -> bool {
        matches!(self, AccrualError::Retriable(_))
    }
}

/// A client of the external accrual calculator.
#[async_trait]
pub trait AccrualClient: Send + Sync {
    /// Asks the calculator about one order. The returned status may well be non-terminal; callers
    /// decide whether to ask again.
    async fn order_accrual(&self, number: &OrderNumber) -> Result<AccrualOrder, AccrualError>;
}

/// Where the HTTP layer hands freshly uploaded orders for background polling.
#[async_trait]
pub trait AccrualRegistry: Send + Sync {
    /// Registers an order that was just committed with status NEW. Unknown or no-longer-NEW
    /// orders are silently ignored.
    async fn register_new_order(&self, number: OrderNumber) -> Result<(), OrderApiError>;
}

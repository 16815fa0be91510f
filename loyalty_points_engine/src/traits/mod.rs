//! Behaviour contracts of the engine.
//!
//! Storage backends implement [`UserManagement`], [`OrderManagement`] and [`BalanceManagement`];
//! the accrual pipeline is split into [`AccrualClient`] (talks to the external calculator) and
//! [`AccrualRegistry`] (accepts freshly uploaded orders for polling). The HTTP layer and the
//! poller only ever see these traits, which is also what makes them mockable in tests.
//!
//! Each trait carries its own error enum. Database driver errors never cross this boundary; the
//! Postgres backend translates them into the domain sentinels defined here.
mod accrual;
mod balance_management;
mod order_management;
mod user_management;

pub use accrual::{AccrualClient, AccrualError, AccrualRegistry};
pub use balance_management::{BalanceApiError, BalanceManagement};
pub use order_management::{OrderApiError, OrderManagement};
pub use user_management::{UserApiError, UserManagement};

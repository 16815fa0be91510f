//! Thin, backend-agnostic APIs over the storage traits. The HTTP layer talks to these instead of
//! the traits directly.
mod auth_api;
mod balance_api;
mod order_api;

pub use auth_api::AuthApi;
pub use balance_api::BalanceApi;
pub use order_api::{OrderApi, OrderSubmission};

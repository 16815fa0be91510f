//! Loyalty Points Engine
//!
//! The engine holds everything below the HTTP edge of the loyalty points gateway:
//!
//! 1. Storage management and control. Postgres is the supported backend. You should never need to
//!    access the database directly; use the API structs in [`lpe_api`] or the traits in [`traits`]
//!    instead. The exception is the data types stored in the database, which are public in
//!    [`db_types`].
//! 2. The accrual pipeline. A background poller tracks every order that has not reached a terminal
//!    status, asks the external accrual calculator about it through a concurrency-bounded client,
//!    and commits the terminal result together with the user's balance credit. See [`accrual`].
//!
//! Balance integrity is anchored in the database: the points balance carries a non-negativity
//! check constraint, and withdrawals debit the balance and append their history record inside a
//! single transaction.
pub mod accrual;
pub mod db_types;
pub mod generator;
pub mod lpe_api;
pub mod postgres;
pub mod retry;
pub mod traits;

pub use lpe_api::{AuthApi, BalanceApi, OrderApi, OrderSubmission};
pub use postgres::PostgresDatabase;

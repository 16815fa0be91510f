//! Postgres backend of the engine.
//!
//! The heavy lifting of balance integrity is pushed into the database itself: `loyalty_points`
//! carries a `balance >= 0` check constraint, the per-user upsert serializes concurrent credits
//! through row-level locking, and a withdrawal debits the balance and appends its history record
//! inside a single transaction. The code in this module translates between those mechanics and
//! the domain sentinels of [`crate::traits`].
mod pg_impl;

pub mod db;

pub use pg_impl::{DatabaseInitError, PostgresDatabase};

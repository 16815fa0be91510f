//! The asynchronous accrual pipeline.
//!
//! [`client::HttpAccrualClient`] performs concurrency-bounded lookups against the external
//! accrual calculator. [`poller::AccrualPoller`] drives every un-finalized order through those
//! lookups until a terminal status arrives, then persists the result and credits the balance.
//! [`tracker::OrdersTracker`] is the in-memory index of orders the poller currently cares about.
pub mod client;
pub mod poller;
pub mod tracker;

pub use client::HttpAccrualClient;
pub use poller::{AccrualPoller, PollerConfig};
pub use tracker::OrdersTracker;

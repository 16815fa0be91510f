//! The background poller that drives every un-finalized order to its terminal state.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::sync::{mpsc, Mutex};

use crate::{
    accrual::tracker::OrdersTracker,
    db_types::{AccrualOrder, Order, OrderNumber, OrderStatus},
    retry::{Retrier, RetrierOptions},
    traits::{AccrualClient, AccrualError, AccrualRegistry, BalanceManagement, OrderApiError, OrderManagement},
};

pub const DEFAULT_RESULTS_CAPACITY: usize = 32;
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Buffer size of the terminal-results channel.
    pub results_capacity: usize,
    /// How often tracked orders with unpersisted terminal state are re-persisted.
    pub sweep_interval: Duration,
    /// Retry policy of the per-order workers.
    pub retry: RetrierOptions,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            results_capacity: DEFAULT_RESULTS_CAPACITY,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            retry: RetrierOptions { retry_any: true, infinite: true, ..Default::default() },
        }
    }
}

/// Polls the accrual calculator for every tracked order.
///
/// One worker task per order keeps asking the external service (through the retrier) until a
/// terminal status arrives, then pushes the result onto an internal channel. A single consumer
/// drains that channel, writes the terminal state to storage and credits the user's balance for
/// processed orders. If persistence fails the order stays in the tracker and a periodic sweeper
/// retries it.
pub struct AccrualPoller<B, C> {
    db: B,
    client: Arc<C>,
    tracker: Arc<OrdersTracker>,
    results: mpsc::Sender<AccrualOrder>,
    receiver: Mutex<Option<mpsc::Receiver<AccrualOrder>>>,
    config: PollerConfig,
}

impl<B, C> AccrualPoller<B, C>
where
    B: OrderManagement + BalanceManagement + Clone + Send + Sync + 'static,
    C: AccrualClient + Send + Sync + 'static,
{
    pub fn new(db: B, client: C) -> Self {
        Self::with_config(db, client, PollerConfig::default())
    }

    pub fn with_config(db: B, client: C, config: PollerConfig) -> Self {
        let (results, receiver) = mpsc::channel(config.results_capacity);
        Self {
            db,
            client: Arc::new(client),
            tracker: Arc::new(OrdersTracker::new()),
            results,
            receiver: Mutex::new(Some(receiver)),
            config,
        }
    }

    /// Orders currently tracked (being polled, or with terminal state awaiting persistence).
    pub async fn tracked_orders(&self) -> Vec<Order> {
        self.tracker.get_all().await
    }

    /// Loads every NEW order from storage into the tracker, then launches the consumer, one
    /// worker per loaded order, and the persistence sweeper. Runs until process exit.
    pub async fn start(&self) -> Result<(), OrderApiError> {
        info!("🔁️ Starting accrual poller");
        let Some(receiver) = self.receiver.lock().await.take() else {
            warn!("🔁️ Accrual poller is already running, ignoring extra start");
            return Ok(());
        };

        let orders = self.db.fetch_orders_by_status(OrderStatus::New).await?;
        info!("🔁️ {} un-finalized orders to poll", orders.len());
        for order in &orders {
            self.tracker.insert(order.clone()).await;
        }

        tokio::spawn(Self::consume(self.db.clone(), Arc::clone(&self.tracker), receiver));
        for order in orders {
            self.spawn_worker(order.number);
        }
        self.spawn_sweeper();
        Ok(())
    }

    /// One ephemeral task per order: ask the accrual service until a terminal status arrives,
    /// push the result, exit.
    fn spawn_worker(&self, number: OrderNumber) {
        let client = Arc::clone(&self.client);
        let results = self.results.clone();
        let mut retrier = Retrier::new(self.config.retry.clone());
        tokio::spawn(async move {
            let outcome = retrier
                .run("ask accrual", || {
                    let client = Arc::clone(&client);
                    let number = number.clone();
                    async move {
                        let accrual = client.order_accrual(&number).await?;
                        if accrual.status.is_terminal() {
                            Ok(accrual)
                        } else {
                            Err(AccrualError::Retriable(format!(
                                "got retriable order accrual status: {}",
                                accrual.status
                            )))
                        }
                    }
                })
                .await;
            match outcome {
                Ok(accrual) => {
                    if results.send(accrual).await.is_err() {
                        error!("🔁️ Accrual results channel closed, dropping result for order {number}");
                    }
                },
                Err(e) => error!("🔁️ Accrual retry for order {number} finished with error: {e}"),
            }
        });
    }

    /// Handles terminal results. Only orders with PROCESSED or INVALID status ever arrive here.
    async fn consume(db: B, tracker: Arc<OrdersTracker>, mut results: mpsc::Receiver<AccrualOrder>) {
        while let Some(accrual) = results.recv().await {
            let Some(mut order) = tracker.get(&accrual.order_id).await else {
                // already handled
                continue;
            };

            order.status = accrual.status;
            order.accrual = accrual.accrual;
            tracker.insert(order.clone()).await;

            let Some(processed_at) = Self::persist_terminal(&db, &order).await else {
                // the sweeper retries it
                continue;
            };

            tracker.remove(&order.number).await;
            info!(
                "🔁️ Order {} processed successfully: status {}, accrual {}, processed_at {processed_at}",
                order.number, order.status, order.accrual
            );
        }
    }

    /// Writes the terminal status to storage and, for processed orders, credits the user's
    /// balance, in that order. Returns `None` when either write fails, leaving the tracker entry
    /// in place.
    async fn persist_terminal(db: &B, order: &Order) -> Option<DateTime<Utc>> {
        let processed_at = match db.set_processed_status(&order.number, order.status, order.accrual).await {
            Ok(ts) => ts,
            Err(e) => {
                error!("🔁️ Error changing order {} status to {}: {e}", order.number, order.status);
                return None;
            },
        };

        if order.status == OrderStatus::Processed {
            if let Err(e) = db.credit_balance(order.accrual, order.user_id).await {
                error!("🔁️ Error crediting user {} balance for order {}: {e}", order.user_id, order.number);
                return None;
            }
        }

        Some(processed_at)
    }

    /// Periodically retries persistence for tracked orders that already carry a terminal status.
    fn spawn_sweeper(&self) {
        let db = self.db.clone();
        let tracker = Arc::clone(&self.tracker);
        let period = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.tick().await;
            loop {
                timer.tick().await;
                for order in tracker.get_all().await {
                    if order.status == OrderStatus::New {
                        continue;
                    }
                    if Self::persist_terminal(&db, &order).await.is_none() {
                        // try again on the next tick
                        continue;
                    }
                    tracker.remove(&order.number).await;
                    info!(
                        "🔁️ Order {} persisted after sweeper retry: status {}, accrual {}",
                        order.number, order.status, order.accrual
                    );
                }
            }
        });
    }
}

#[async_trait]
impl<B, C> AccrualRegistry for AccrualPoller<B, C>
where
    B: OrderManagement + BalanceManagement + Clone + Send + Sync + 'static,
    C: AccrualClient + Send + Sync + 'static,
{
    async fn register_new_order(&self, number: OrderNumber) -> Result<(), OrderApiError> {
        let Some(order) = self.db.fetch_order(&number).await? else {
            // the HTTP path validated creation, so this should never fire
            warn!("🔁️ Attempt to register order {number} that does not exist");
            return Ok(());
        };

        if order.status != OrderStatus::New {
            return Ok(());
        }

        self.tracker.insert(order.clone()).await;
        self.spawn_worker(order.number);
        Ok(())
    }
}

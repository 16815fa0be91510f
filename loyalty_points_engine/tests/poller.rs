//! End-to-end tests of the accrual poller against an in-memory store and a scripted client.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loyalty_points_engine::{
    accrual::{AccrualPoller, PollerConfig},
    db_types::{AccrualOrder, Balance, Order, OrderNumber, OrderStatus, Withdrawal},
    retry::RetrierOptions,
    traits::{
        AccrualClient,
        AccrualError,
        AccrualRegistry,
        BalanceApiError,
        BalanceManagement,
        OrderApiError,
        OrderManagement,
    },
};

#[derive(Default)]
struct StoreState {
    orders: HashMap<OrderNumber, Order>,
    balances: HashMap<i64, f64>,
    credits: Vec<(i64, f64)>,
    failing_status_writes: usize,
}

#[derive(Clone, Default)]
struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    fn with_new_order(number: &str, user_id: i64) -> Self {
        let store = Self::default();
        let order = Order::new(OrderNumber::from(number), user_id);
        store.state.lock().unwrap().orders.insert(order.number.clone(), order);
        store
    }

    fn fail_next_status_writes(&self, count: usize) {
        self.state.lock().unwrap().failing_status_writes = count;
    }

    fn order(&self, number: &str) -> Option<Order> {
        self.state.lock().unwrap().orders.get(&OrderNumber::from(number)).cloned()
    }

    fn balance_of(&self, user_id: i64) -> f64 {
        self.state.lock().unwrap().balances.get(&user_id).copied().unwrap_or(0.0)
    }

    fn credit_count(&self) -> usize {
        self.state.lock().unwrap().credits.len()
    }
}

#[async_trait]
impl OrderManagement for MemoryStore {
    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, OrderApiError> {
        Ok(self.state.lock().unwrap().orders.get(number).cloned())
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderApiError> {
        let mut orders: Vec<Order> =
            self.state.lock().unwrap().orders.values().filter(|o| o.user_id == user_id).cloned().collect();
        orders.sort_by_key(|o| o.uploaded_at);
        Ok(orders)
    }

    async fn fetch_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderApiError> {
        Ok(self.state.lock().unwrap().orders.values().filter(|o| o.status == status).cloned().collect())
    }

    async fn insert_order(&self, order: Order) -> Result<(), OrderApiError> {
        let mut state = self.state.lock().unwrap();
        if state.orders.contains_key(&order.number) {
            return Err(OrderApiError::DuplicateOrder(order.number));
        }
        state.orders.insert(order.number.clone(), order);
        Ok(())
    }

    async fn set_processed_status(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: f64,
    ) -> Result<DateTime<Utc>, OrderApiError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_status_writes > 0 {
            state.failing_status_writes -= 1;
            return Err(OrderApiError::DatabaseError("injected failure".to_string()));
        }
        let processed_at = Utc::now();
        let order = state.orders.get_mut(number).ok_or_else(|| OrderApiError::OrderNotFound(number.clone()))?;
        order.status = status;
        order.accrual = accrual;
        order.processed_at = Some(processed_at);
        Ok(processed_at)
    }

    async fn last_order_number(&self) -> Result<OrderNumber, OrderApiError> {
        Ok(OrderNumber::from("0"))
    }
}

#[async_trait]
impl BalanceManagement for MemoryStore {
    async fn credit_balance(&self, accrual: f64, user_id: i64) -> Result<Balance, BalanceApiError> {
        let accrual = accrual.max(0.0);
        let mut state = self.state.lock().unwrap();
        let balance = state.balances.entry(user_id).or_insert(0.0);
        *balance += accrual;
        let balance = *balance;
        state.credits.push((user_id, accrual));
        Ok(Balance { user_id, balance, total_withdrawn: 0.0, updated: Utc::now() })
    }

    async fn withdraw(&self, sum: f64, user_id: i64, _order_number: &OrderNumber) -> Result<(), BalanceApiError> {
        let mut state = self.state.lock().unwrap();
        let balance = state.balances.entry(user_id).or_insert(0.0);
        if *balance - sum < 0.0 {
            return Err(BalanceApiError::NegativeBalance);
        }
        *balance -= sum;
        Ok(())
    }

    async fn fetch_balance(&self, user_id: i64) -> Result<Balance, BalanceApiError> {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&user_id)
            .map(|&balance| Balance { user_id, balance, total_withdrawn: 0.0, updated: Utc::now() })
            .ok_or(BalanceApiError::BalanceNotFound(user_id))
    }

    async fn withdrawals(&self, _user_id: i64) -> Result<Vec<Withdrawal>, BalanceApiError> {
        Ok(Vec::new())
    }
}

/// Returns canned responses in order; once the script runs out every further call is retriable.
#[derive(Clone)]
struct ScriptedClient {
    responses: Arc<Mutex<VecDeque<Result<AccrualOrder, AccrualError>>>>,
}

impl ScriptedClient {
    fn new(responses: Vec<Result<AccrualOrder, AccrualError>>) -> Self {
        Self { responses: Arc::new(Mutex::new(responses.into())) }
    }
}

#[async_trait]
impl AccrualClient for ScriptedClient {
    async fn order_accrual(&self, number: &OrderNumber) -> Result<AccrualOrder, AccrualError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AccrualError::Retriable(format!("script exhausted for order {number}"))))
    }
}

fn processed(number: &str, accrual: f64) -> Result<AccrualOrder, AccrualError> {
    Ok(AccrualOrder { order_id: OrderNumber::from(number), status: OrderStatus::Processed, accrual })
}

fn invalid(number: &str) -> Result<AccrualOrder, AccrualError> {
    Ok(AccrualOrder { order_id: OrderNumber::from(number), status: OrderStatus::Invalid, accrual: 0.0 })
}

fn registered(number: &str) -> Result<AccrualOrder, AccrualError> {
    Ok(AccrualOrder { order_id: OrderNumber::from(number), status: OrderStatus::Registered, accrual: 0.0 })
}

fn not_registered() -> Result<AccrualOrder, AccrualError> {
    Err(AccrualError::Retriable("order was not registered - status code: 204 No Content".to_string()))
}

fn fast_config() -> PollerConfig {
    PollerConfig {
        sweep_interval: Duration::from_millis(20),
        retry: RetrierOptions {
            interval: Duration::from_millis(1),
            retry_any: true,
            infinite: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test(flavor = "multi_thread")]
async fn order_is_credited_once_despite_retriable_responses() {
    let _ = env_logger::try_init().ok();
    let store = MemoryStore::with_new_order("12345678903", 7);
    // five "not registered yet" answers, then a non-terminal status, then the terminal one
    let client = ScriptedClient::new(vec![
        not_registered(),
        not_registered(),
        not_registered(),
        not_registered(),
        not_registered(),
        registered("12345678903"),
        processed("12345678903", 100.0),
    ]);
    let poller = AccrualPoller::with_config(store.clone(), client, fast_config());
    poller.start().await.unwrap();

    wait_until(|| store.order("12345678903").map(|o| o.status == OrderStatus::Processed).unwrap_or(false)).await;

    let order = store.order("12345678903").unwrap();
    assert_eq!(order.accrual, 100.0);
    assert!(order.processed_at.is_some());
    assert_eq!(store.balance_of(7), 100.0);
    assert_eq!(store.credit_count(), 1, "exactly one credit per processed order");
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_orders_are_persisted_without_credit() {
    let _ = env_logger::try_init().ok();
    let store = MemoryStore::with_new_order("79927398713", 3);
    let client = ScriptedClient::new(vec![invalid("79927398713")]);
    let poller = AccrualPoller::with_config(store.clone(), client, fast_config());
    poller.start().await.unwrap();

    wait_until(|| store.order("79927398713").map(|o| o.status == OrderStatus::Invalid).unwrap_or(false)).await;

    assert_eq!(store.balance_of(3), 0.0);
    assert_eq!(store.credit_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn sweeper_retries_failed_persistence() {
    let _ = env_logger::try_init().ok();
    let store = MemoryStore::with_new_order("12345678903", 11);
    store.fail_next_status_writes(2);
    let client = ScriptedClient::new(vec![processed("12345678903", 50.0)]);
    let poller = AccrualPoller::with_config(store.clone(), client, fast_config());
    poller.start().await.unwrap();

    wait_until(|| store.order("12345678903").map(|o| o.status == OrderStatus::Processed).unwrap_or(false)).await;

    assert_eq!(store.balance_of(11), 50.0);
    assert_eq!(store.credit_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn tracker_is_drained_after_persistence() {
    let _ = env_logger::try_init().ok();
    let store = MemoryStore::with_new_order("12345678903", 5);
    let client = ScriptedClient::new(vec![processed("12345678903", 10.0)]);
    let poller = AccrualPoller::with_config(store.clone(), client, fast_config());
    poller.start().await.unwrap();

    wait_until(|| store.order("12345678903").map(|o| o.status == OrderStatus::Processed).unwrap_or(false)).await;

    // removal happens right after the persistence commit
    for _ in 0..100 {
        if poller.tracked_orders().await.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("tracker was not drained");
}

#[tokio::test(flavor = "multi_thread")]
async fn register_new_order_ignores_unknown_and_finalized_orders() {
    let _ = env_logger::try_init().ok();
    let store = MemoryStore::default();
    let client = ScriptedClient::new(vec![]);
    let poller = AccrualPoller::with_config(store.clone(), client, fast_config());
    poller.start().await.unwrap();

    // unknown order: logged and ignored
    poller.register_new_order(OrderNumber::from("12345678903")).await.unwrap();
    assert!(poller.tracked_orders().await.is_empty());

    // order that is no longer NEW: ignored
    let mut order = Order::new(OrderNumber::from("79927398713"), 2);
    order.status = OrderStatus::Processed;
    store.state.lock().unwrap().orders.insert(order.number.clone(), order);
    poller.register_new_order(OrderNumber::from("79927398713")).await.unwrap();
    assert!(poller.tracked_orders().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn registered_new_order_is_polled_to_completion() {
    let _ = env_logger::try_init().ok();
    let store = MemoryStore::default();
    let client = ScriptedClient::new(vec![not_registered(), processed("4561261212345467", 729.98)]);
    let poller = AccrualPoller::with_config(store.clone(), client, fast_config());
    poller.start().await.unwrap();

    let order = Order::new(OrderNumber::from("4561261212345467"), 9);
    store.state.lock().unwrap().orders.insert(order.number.clone(), order);
    poller.register_new_order(OrderNumber::from("4561261212345467")).await.unwrap();

    wait_until(|| store.order("4561261212345467").map(|o| o.status == OrderStatus::Processed).unwrap_or(false)).await;
    assert_eq!(store.balance_of(9), 729.98);
}

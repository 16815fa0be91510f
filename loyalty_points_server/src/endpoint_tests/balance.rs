use actix_web::{
    http::StatusCode,
    web::{self, ServiceConfig},
};
use chrono::{TimeZone, Utc};
use loyalty_points_engine::{
    db_types::{Balance, OrderNumber, Withdrawal},
    traits::BalanceApiError,
    BalanceApi,
};
use serde_json::json;
use uuid::Uuid;

use super::{
    helpers::{get_request, post_json, user_token},
    mocks::MockBalanceStore,
};
use crate::routes;

fn balance_routes(balances: MockBalanceStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(BalanceApi::new(balances)))
            .route("/balance", web::get().to(routes::get_balance::<MockBalanceStore>))
            .route("/balance/withdraw", web::post().to(routes::withdraw::<MockBalanceStore>))
            .route("/withdrawals", web::get().to(routes::get_withdrawals::<MockBalanceStore>));
    }
}

fn balance_of(user_id: i64, balance: f64, withdrawn: f64) -> Balance {
    Balance { user_id, balance, total_withdrawn: withdrawn, updated: Utc::now() }
}

#[actix_web::test]
async fn balance_renders_current_and_withdrawn() {
    let _ = env_logger::try_init().ok();
    let mut balances = MockBalanceStore::new();
    balances.expect_fetch_balance().returning(|user_id| Ok(balance_of(user_id, 500.5, 42.0)));

    let token = user_token(3);
    let (status, body) = get_request(Some(&token), "/balance", balance_routes(balances)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"current":500.5,"withdrawn":42.0}"#);
}

#[actix_web::test]
async fn missing_balance_row_reads_as_zero() {
    let _ = env_logger::try_init().ok();
    let mut balances = MockBalanceStore::new();
    balances.expect_fetch_balance().returning(|user_id| Err(BalanceApiError::BalanceNotFound(user_id)));

    let token = user_token(3);
    let (status, body) = get_request(Some(&token), "/balance", balance_routes(balances)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"current":0.0,"withdrawn":0.0}"#);
}

#[actix_web::test]
async fn withdraw_debits_and_returns_ok() {
    let _ = env_logger::try_init().ok();
    let mut balances = MockBalanceStore::new();
    balances.expect_fetch_balance().returning(|user_id| Ok(balance_of(user_id, 500.0, 0.0)));
    balances
        .expect_withdraw()
        .times(1)
        .withf(|sum, user_id, order| *sum == 100.0 && *user_id == 3 && order == &OrderNumber::from("79927398713"))
        .returning(|_, _, _| Ok(()));

    let token = user_token(3);
    let (status, _, _) = post_json(
        Some(&token),
        "/balance/withdraw",
        json!({"order": "79927398713", "sum": 100.0}),
        balance_routes(balances),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn withdraw_rejects_an_overdraft_before_touching_the_db() {
    let _ = env_logger::try_init().ok();
    let mut balances = MockBalanceStore::new();
    balances.expect_fetch_balance().returning(|user_id| Ok(balance_of(user_id, 500.0, 0.0)));
    // no expect_withdraw: reaching the store would fail the test

    let token = user_token(3);
    let (status, _, _) = post_json(
        Some(&token),
        "/balance/withdraw",
        json!({"order": "79927398713", "sum": 600.0}),
        balance_routes(balances),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[actix_web::test]
async fn withdraw_maps_the_check_constraint_to_payment_required() {
    // the pre-check passed but a concurrent withdrawal won the race
    let _ = env_logger::try_init().ok();
    let mut balances = MockBalanceStore::new();
    balances.expect_fetch_balance().returning(|user_id| Ok(balance_of(user_id, 500.0, 0.0)));
    balances.expect_withdraw().returning(|_, _, _| Err(BalanceApiError::NegativeBalance));

    let token = user_token(3);
    let (status, _, _) = post_json(
        Some(&token),
        "/balance/withdraw",
        json!({"order": "79927398713", "sum": 400.0}),
        balance_routes(balances),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[actix_web::test]
async fn withdraw_rejects_luhn_invalid_order_numbers() {
    let _ = env_logger::try_init().ok();
    let token = user_token(3);
    let (status, _, _) = post_json(
        Some(&token),
        "/balance/withdraw",
        json!({"order": "12345678904", "sum": 100.0}),
        balance_routes(MockBalanceStore::new()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn empty_withdrawal_history_is_no_content() {
    let _ = env_logger::try_init().ok();
    let mut balances = MockBalanceStore::new();
    balances.expect_withdrawals().returning(|_| Ok(Vec::new()));

    let token = user_token(3);
    let (status, _) = get_request(Some(&token), "/withdrawals", balance_routes(balances)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn withdrawal_history_renders_the_documented_shape() {
    let _ = env_logger::try_init().ok();
    let mut balances = MockBalanceStore::new();
    balances.expect_withdrawals().returning(|_| {
        Ok(vec![Withdrawal {
            id: Uuid::nil(),
            order_number: OrderNumber::from("79927398713"),
            value: 100.0,
            processed_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
        }])
    });

    let token = user_token(3);
    let (status, body) = get_request(Some(&token), "/withdrawals", balance_routes(balances)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"[{"order":"79927398713","sum":100.0,"processed_at":"2024-05-02T09:30:00+00:00"}]"#);
}

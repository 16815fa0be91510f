use actix_web::{
    http::StatusCode,
    web::{self, ServiceConfig},
};
use chrono::{TimeZone, Utc};
use loyalty_points_engine::{
    db_types::{Order, OrderNumber, OrderStatus},
    OrderApi,
};

use super::{
    helpers::{get_request, post_raw, user_token},
    mocks::{MockOrderStore, MockRegistry},
};
use crate::routes;

fn order_routes(orders: MockOrderStore, registry: MockRegistry) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderApi::new(orders)))
            .app_data(web::Data::new(registry))
            .route("/orders", web::post().to(routes::post_orders::<MockOrderStore, MockRegistry>))
            .route("/orders", web::get().to(routes::get_orders::<MockOrderStore>));
    }
}

fn stored_order(number: &str, user_id: i64) -> Order {
    let mut order = Order::new(OrderNumber::from(number), user_id);
    order.uploaded_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    order
}

#[actix_web::test]
async fn fresh_order_is_accepted_and_registered_with_the_poller() {
    let _ = env_logger::try_init().ok();
    let mut orders = MockOrderStore::new();
    orders.expect_fetch_order().returning(|_| Ok(None));
    orders.expect_insert_order().returning(|_| Ok(()));
    let mut registry = MockRegistry::new();
    registry
        .expect_register_new_order()
        .times(1)
        .withf(|number| number == &OrderNumber::from("12345678903"))
        .returning(|_| Ok(()));

    let token = user_token(1);
    let (status, _) = post_raw(Some(&token), "/orders", "12345678903", order_routes(orders, registry)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[actix_web::test]
async fn same_user_resubmit_returns_ok_without_a_new_row() {
    let _ = env_logger::try_init().ok();
    let mut orders = MockOrderStore::new();
    orders.expect_fetch_order().returning(|number| Ok(Some(stored_order(number.as_str(), 1))));

    let token = user_token(1);
    let (status, _) =
        post_raw(Some(&token), "/orders", "12345678903", order_routes(orders, MockRegistry::new())).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn order_uploaded_by_another_user_conflicts() {
    let _ = env_logger::try_init().ok();
    let mut orders = MockOrderStore::new();
    orders.expect_fetch_order().returning(|number| Ok(Some(stored_order(number.as_str(), 999))));

    let token = user_token(1);
    let (status, _) =
        post_raw(Some(&token), "/orders", "12345678903", order_routes(orders, MockRegistry::new())).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn luhn_invalid_numbers_are_unprocessable() {
    let _ = env_logger::try_init().ok();
    let token = user_token(1);
    let (status, _) = post_raw(
        Some(&token),
        "/orders",
        "12345678904",
        order_routes(MockOrderStore::new(), MockRegistry::new()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post_raw(
        Some(&token),
        "/orders",
        "not-a-number",
        order_routes(MockOrderStore::new(), MockRegistry::new()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn orders_require_authentication() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        post_raw(None, "/orders", "12345678903", order_routes(MockOrderStore::new(), MockRegistry::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get_request(None, "/orders", order_routes(MockOrderStore::new(), MockRegistry::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn garbage_tokens_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(
        Some("definitely-not-a-jwt"),
        "/orders",
        order_routes(MockOrderStore::new(), MockRegistry::new()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn empty_order_list_is_no_content() {
    let _ = env_logger::try_init().ok();
    let mut orders = MockOrderStore::new();
    orders.expect_fetch_orders_for_user().returning(|_| Ok(Vec::new()));

    let token = user_token(1);
    let (status, _) = get_request(Some(&token), "/orders", order_routes(orders, MockRegistry::new())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn order_list_renders_the_documented_shape() {
    let _ = env_logger::try_init().ok();
    let mut orders = MockOrderStore::new();
    orders.expect_fetch_orders_for_user().returning(|user_id| {
        let mut processed = stored_order("12345678903", user_id);
        processed.status = OrderStatus::Processed;
        processed.accrual = 500.0;
        let fresh = stored_order("79927398713", user_id);
        Ok(vec![processed, fresh])
    });

    let token = user_token(1);
    let (status, body) = get_request(Some(&token), "/orders", order_routes(orders, MockRegistry::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"[{"number":"12345678903","status":"PROCESSED","accrual":500.0,"uploaded_at":"2024-05-01T12:00:00+00:00"},{"number":"79927398713","status":"NEW","uploaded_at":"2024-05-01T12:00:00+00:00"}]"#
    );
}

#[actix_web::test]
async fn poller_failures_do_not_fail_the_upload() {
    let _ = env_logger::try_init().ok();
    let mut orders = MockOrderStore::new();
    orders.expect_fetch_order().returning(|_| Ok(None));
    orders.expect_insert_order().returning(|_| Ok(()));
    let mut registry = MockRegistry::new();
    registry.expect_register_new_order().returning(|_| {
        Err(loyalty_points_engine::traits::OrderApiError::DatabaseError("poller unavailable".to_string()))
    });

    let token = user_token(1);
    let (status, _) = post_raw(Some(&token), "/orders", "12345678903", order_routes(orders, registry)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

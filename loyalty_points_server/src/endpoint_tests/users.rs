use actix_web::{
    http::StatusCode,
    web::{self, ServiceConfig},
};
use loyalty_points_engine::{db_types::User, AuthApi};
use serde_json::json;

use super::{
    helpers::{post_json, test_issuer},
    mocks::MockUserStore,
};
use crate::routes;

// low bcrypt cost to keep the tests quick
fn test_user(id: i64, login: &str, password: &str) -> User {
    User { id, login: login.to_string(), password_hash: bcrypt::hash(password, 4).unwrap() }
}

fn register_route(users: MockUserStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(AuthApi::new(users)))
            .route("/register", web::post().to(routes::register::<MockUserStore>));
    }
}

fn login_route(users: MockUserStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(AuthApi::new(users)))
            .route("/login", web::post().to(routes::login::<MockUserStore>));
    }
}

#[actix_web::test]
async fn register_issues_a_bearer_token() {
    let _ = env_logger::try_init().ok();
    let mut users = MockUserStore::new();
    users.expect_fetch_user_by_login().returning(|_| Ok(None));
    users
        .expect_create_user()
        .returning(|login, hash| Ok(User { id: 42, login: login.to_string(), password_hash: hash.to_string() }));

    let (status, headers, _) =
        post_json(None, "/register", json!({"login": "Alice", "password": "secret"}), register_route(users)).await;

    assert_eq!(status, StatusCode::OK);
    let auth = headers.get("Authorization").unwrap().to_str().unwrap();
    let token = auth.strip_prefix("Bearer ").expect("Authorization header must carry a bearer token");
    assert_eq!(test_issuer().validate_token(token).unwrap().user_id, 42);
}

#[actix_web::test]
async fn register_rejects_a_taken_login() {
    let _ = env_logger::try_init().ok();
    let mut users = MockUserStore::new();
    users.expect_fetch_user_by_login().returning(|login| Ok(Some(test_user(1, login, "whatever"))));

    let (status, _, _) =
        post_json(None, "/register", json!({"login": "alice", "password": "secret"}), register_route(users)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn register_rejects_empty_credentials() {
    let _ = env_logger::try_init().ok();
    let (status, _, _) =
        post_json(None, "/register", json!({"login": "  ", "password": "secret"}), register_route(MockUserStore::new()))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) =
        post_json(None, "/register", json!({"login": "alice", "password": ""}), register_route(MockUserStore::new()))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn register_rejects_passwords_over_the_bcrypt_limit() {
    let _ = env_logger::try_init().ok();
    let too_long = "x".repeat(73);
    let (status, _, _) =
        post_json(None, "/register", json!({"login": "alice", "password": too_long}), register_route(MockUserStore::new()))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn register_rejects_unreadable_bodies() {
    let _ = env_logger::try_init().ok();
    let (status, _, _) =
        post_json(None, "/register", json!({"nonsense": true}), register_route(MockUserStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_issues_a_bearer_token() {
    let _ = env_logger::try_init().ok();
    let mut users = MockUserStore::new();
    users.expect_fetch_user_by_login().returning(|login| Ok(Some(test_user(7, login, "secret"))));

    let (status, headers, _) =
        post_json(None, "/login", json!({"login": "bob", "password": "secret"}), login_route(users)).await;

    assert_eq!(status, StatusCode::OK);
    let auth = headers.get("Authorization").unwrap().to_str().unwrap();
    let token = auth.strip_prefix("Bearer ").unwrap();
    assert_eq!(test_issuer().validate_token(token).unwrap().user_id, 7);
}

#[actix_web::test]
async fn login_rejects_a_wrong_password() {
    let _ = env_logger::try_init().ok();
    let mut users = MockUserStore::new();
    users.expect_fetch_user_by_login().returning(|login| Ok(Some(test_user(7, login, "secret"))));

    let (status, _, _) =
        post_json(None, "/login", json!({"login": "bob", "password": "not-secret"}), login_route(users)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn login_rejects_an_unknown_login() {
    let _ = env_logger::try_init().ok();
    let mut users = MockUserStore::new();
    users.expect_fetch_user_by_login().returning(|_| Ok(None));

    let (status, _, _) =
        post_json(None, "/login", json!({"login": "nobody", "password": "secret"}), login_route(users)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

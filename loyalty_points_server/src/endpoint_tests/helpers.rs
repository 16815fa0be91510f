use actix_web::{
    http::{header::HeaderMap, StatusCode},
    test,
    web::{self, ServiceConfig},
    App,
};
use chrono::Duration;
use lpg_common::Secret;
use serde_json::Value;

use crate::auth::TokenIssuer;

pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(&Secret::new("endpoint-test-secret".to_string()), Duration::hours(1))
}

pub fn user_token(user_id: i64) -> String {
    test_issuer().issue_token(user_id).unwrap()
}

async fn call<F>(req: test::TestRequest, configure: F) -> (StatusCode, HeaderMap, String)
where F: FnOnce(&mut ServiceConfig) {
    let app =
        test::init_service(App::new().app_data(web::Data::new(test_issuer())).configure(configure)).await;
    let response = test::call_service(&app, req.to_request()).await;
    let status = response.status();
    let headers = response.headers().clone();
    let body = test::read_body(response).await;
    (status, headers, String::from_utf8_lossy(&body).to_string())
}

pub async fn get_request<F>(token: Option<&str>, path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = test::TestRequest::get().uri(path);
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    let (status, _, body) = call(req, configure).await;
    (status, body)
}

pub async fn post_json<F>(
    token: Option<&str>,
    path: &str,
    payload: Value,
    configure: F,
) -> (StatusCode, HeaderMap, String)
where
    F: FnOnce(&mut ServiceConfig),
{
    let mut req = test::TestRequest::post().uri(path).set_json(&payload);
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    call(req, configure).await
}

pub async fn post_raw<F>(token: Option<&str>, path: &str, payload: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = test::TestRequest::post().uri(path).set_payload(payload.to_string());
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    let (status, _, body) = call(req, configure).await;
    (status, body)
}

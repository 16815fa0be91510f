//! HTTP client for the external accrual calculator.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::trace;
use reqwest::{header, Client, StatusCode};
use tokio::sync::Semaphore;

use crate::{
    db_types::{AccrualOrder, OrderNumber},
    traits::{AccrualClient, AccrualError},
};

/// Upper bound on concurrent in-flight requests to the accrual service.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Performs `GET {base}/api/orders/{number}` with a counting semaphore limiting the number of
/// in-flight calls. Every call acquires a permit before the request goes out and releases it when
/// the response has been read.
#[derive(Clone)]
pub struct HttpAccrualClient {
    client: Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl HttpAccrualClient {
    pub fn new(base_url: &str) -> Result<Self, AccrualError> {
        Self::with_max_in_flight(base_url, DEFAULT_MAX_IN_FLIGHT)
    }

    pub fn with_max_in_flight(base_url: &str, max_in_flight: usize) -> Result<Self, AccrualError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AccrualError::Failed(format!("error building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
        })
    }
}

#[async_trait]
impl AccrualClient for HttpAccrualClient {
    async fn order_accrual(&self, number: &OrderNumber) -> Result<AccrualOrder, AccrualError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| AccrualError::Failed(format!("accrual request semaphore closed: {e}")))?;
        let url = format!("{}/api/orders/{}", self.base_url, number);
        trace!("📡️ GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AccrualError::Retriable(format!("error while doing the request: {e}")))?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response
            .bytes()
            .await
            .map_err(|e| AccrualError::Retriable(format!("error reading response bytes: {e}")))?;
        classify(number, status, &body, retry_after.as_deref())
    }
}

/// Maps one accrual service response to either a decoded accrual or an error that tells the
/// retrier whether another attempt is worthwhile. Only a 200 body is decoded; error pages on the
/// other statuses are carried verbatim in the error text.
fn classify(
    number: &OrderNumber,
    status: StatusCode,
    body: &[u8],
    retry_after: Option<&str>,
) -> Result<AccrualOrder, AccrualError> {
    match status {
        StatusCode::OK => serde_json::from_slice::<AccrualOrder>(body)
            .map_err(|e| AccrualError::Failed(format!("error decoding response body: {e}, order: {number}"))),
        // the order is not registered in the accrual system yet
        StatusCode::NO_CONTENT => Err(AccrualError::Retriable(format!(
            "order was not registered - status code: {status}, order: {number}"
        ))),
        StatusCode::TOO_MANY_REQUESTS => Err(AccrualError::Retriable(format!(
            "too many requests - status code: {status}, order: {number}, retry-after: {}, body: {}",
            retry_after.unwrap_or(""),
            String::from_utf8_lossy(body)
        ))),
        StatusCode::INTERNAL_SERVER_ERROR => Err(AccrualError::Retriable(format!(
            "internal server error - status code: {status}, order: {number}, body: {}",
            String::from_utf8_lossy(body)
        ))),
        _ => Err(AccrualError::Failed(format!(
            "unexpected response status code: {status}, order: {number}, body: {}",
            String::from_utf8_lossy(body)
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{db_types::OrderStatus, retry::MaybeRetriable};

    fn number() -> OrderNumber {
        OrderNumber::from("12345678903")
    }

    #[test]
    fn ok_decodes_the_accrual() {
        let body = br#"{"order":"12345678903","status":"PROCESSED","accrual":500}"#;
        let accrual = classify(&number(), StatusCode::OK, body, None).unwrap();
        assert_eq!(accrual.order_id, number());
        assert_eq!(accrual.status, OrderStatus::Processed);
        assert_eq!(accrual.accrual, 500.0);
    }

    #[test]
    fn no_content_is_retriable() {
        let err = classify(&number(), StatusCode::NO_CONTENT, b"", None).unwrap_err();
        assert!(err.is_retriable(), "{err}");
    }

    #[test]
    fn too_many_requests_is_retriable_and_surfaces_retry_after() {
        let err = classify(&number(), StatusCode::TOO_MANY_REQUESTS, b"", Some("60")).unwrap_err();
        assert!(err.is_retriable());
        assert!(err.to_string().contains("retry-after: 60"));
    }

    #[test]
    fn internal_server_error_is_retriable() {
        let err = classify(&number(), StatusCode::INTERNAL_SERVER_ERROR, b"boom", None).unwrap_err();
        assert!(err.is_retriable());
    }

    #[test]
    fn non_json_error_pages_do_not_defeat_retriable_statuses() {
        let err = classify(&number(), StatusCode::TOO_MANY_REQUESTS, b"<html>rate limited</html>", Some("60"))
            .unwrap_err();
        assert!(err.is_retriable(), "{err}");
        let err = classify(&number(), StatusCode::INTERNAL_SERVER_ERROR, b"<html>oops</html>", None).unwrap_err();
        assert!(err.is_retriable(), "{err}");
    }

    #[test]
    fn other_statuses_are_not_retriable() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND, StatusCode::BAD_GATEWAY] {
            let err = classify(&number(), status, b"not json either", None).unwrap_err();
            assert!(!err.is_retriable(), "{status} must not be retriable");
        }
    }

    #[test]
    fn garbage_bodies_fail_decoding() {
        let err = classify(&number(), StatusCode::OK, b"not json", None).unwrap_err();
        assert!(!err.is_retriable());
    }
}

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use loyalty_points_engine::{
    db_types::OrderNumberError,
    traits::{BalanceApiError, OrderApiError, UserApiError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Authentication failed: {0}")]
    Unauthorized(String),
    #[error("Insufficient points on the balance")]
    InsufficientPoints,
    #[error("Login is already taken")]
    LoginUnavailable,
    #[error("Order has already been uploaded by another user")]
    OrderConflict,
    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(#[from] OrderNumberError),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not initialize the server. {0}")]
    InitializeError(String),
    #[error("Backend error: {0}")]
    BackendError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPoints => StatusCode::PAYMENT_REQUIRED,
            Self::LoginUnavailable | Self::OrderConflict => StatusCode::CONFLICT,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}

impl From<UserApiError> for ServerError {
    fn from(e: UserApiError) -> Self {
        match e {
            UserApiError::LoginUnavailable => Self::LoginUnavailable,
            other => Self::BackendError(other.to_string()),
        }
    }
}

impl From<OrderApiError> for ServerError {
    fn from(e: OrderApiError) -> Self {
        match e {
            OrderApiError::OwnedByAnotherUser(_) | OrderApiError::DuplicateOrder(_) => Self::OrderConflict,
            other => Self::BackendError(other.to_string()),
        }
    }
}

impl From<BalanceApiError> for ServerError {
    fn from(e: BalanceApiError) -> Self {
        match e {
            BalanceApiError::NegativeBalance => Self::InsufficientPoints,
            other => Self::BackendError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn engine_sentinels_map_to_the_documented_status_codes() {
        assert_eq!(ServerError::from(UserApiError::LoginUnavailable).status_code(), StatusCode::CONFLICT);
        assert_eq!(ServerError::from(BalanceApiError::NegativeBalance).status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            ServerError::from(OrderApiError::OwnedByAnotherUser("1".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServerError::from(UserApiError::DatabaseError("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::InvalidOrderNumber(OrderNumberError::LuhnCheck).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}

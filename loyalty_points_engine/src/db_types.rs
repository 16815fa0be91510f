use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use lpg_common::luhn::{self, LuhnError};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

/// The one layout every timestamp is rendered with on the wire.
pub const TIMESTAMP_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_LAYOUT;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format(TIMESTAMP_LAYOUT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&s, TIMESTAMP_LAYOUT).map(|ts| ts.with_timezone(&Utc)).map_err(D::Error::custom)
    }
}

//--------------------------------------        User        ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    #[sqlx(rename = "password")]
    #[serde(skip_serializing)]
    pub password_hash: String,
}

//--------------------------------------     OrderNumber     ---------------------------------------------------------
/// A decimal order number. Validity (digits only, Luhn checksum) is checked explicitly via
/// [`OrderNumber::validate`]; construction itself never fails so that numbers read back from
/// storage or the wire can be carried around as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderNumberError {
    #[error("order number must contain only arabic numbers")]
    BadChars,
    #[error("order number must be a valid sequence of Luhn algorithm")]
    LuhnCheck,
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<(), OrderNumberError> {
        match luhn::validate(&self.0) {
            Ok(()) => Ok(()),
            Err(LuhnError::ChecksumMismatch) => Err(OrderNumberError::LuhnCheck),
            Err(LuhnError::NonDigit | LuhnError::Empty) => Err(OrderNumberError::BadChars),
        }
    }
}

impl<S: Into<String>> From<S> for OrderNumber {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl FromStr for OrderNumber {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     OrderStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Uploaded, not yet known to the accrual calculator
    New,
    /// Known to the accrual calculator, accrual not yet computed
    Registered,
    /// Accrual computation in progress
    Processing,
    /// Accrual computed and credited. Terminal.
    Processed,
    /// Rejected by the accrual calculator, nothing is credited. Terminal.
    Invalid,
}

impl OrderStatus {
    /// Terminal statuses stop the polling loop for an order.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Processed | OrderStatus::Invalid)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::New => "NEW",
            OrderStatus::Registered => "REGISTERED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Processed => "PROCESSED",
            OrderStatus::Invalid => "INVALID",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct StatusConversionError(String);

impl FromStr for OrderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "REGISTERED" => Ok(Self::Registered),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            other => Err(StatusConversionError(other.to_string())),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = StatusConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    #[sqlx(rename = "id")]
    pub number: OrderNumber,
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "accrual_is_zero")]
    pub accrual: f64,
    #[serde(with = "timestamp")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub processed_at: Option<DateTime<Utc>>,
}

fn accrual_is_zero(accrual: &f64) -> bool {
    *accrual == 0.0
}

impl Order {
    /// A freshly uploaded order: status NEW, nothing accrued yet.
    pub fn new(number: OrderNumber, user_id: i64) -> Self {
        Self {
            number,
            user_id,
            status: OrderStatus::New,
            accrual: 0.0,
            uploaded_at: Utc::now(),
            processed_at: None,
        }
    }
}

//--------------------------------------     AccrualOrder    ---------------------------------------------------------
/// The accrual calculator's answer for a single order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualOrder {
    #[serde(rename = "order")]
    pub order_id: OrderNumber,
    pub status: OrderStatus,
    #[serde(default)]
    pub accrual: f64,
}

//--------------------------------------       Balance       ---------------------------------------------------------
/// Current loyalty points of one user. `total_withdrawn` is always derived from the withdrawal
/// history, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct Balance {
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[serde(rename = "current")]
    pub balance: f64,
    #[serde(rename = "withdrawn")]
    pub total_withdrawn: f64,
    #[serde(skip_serializing)]
    pub updated: DateTime<Utc>,
}

impl Balance {
    /// What a user who has never been credited sees.
    pub fn empty(user_id: i64) -> Self {
        Self { user_id, balance: 0.0, total_withdrawn: 0.0, updated: Utc::now() }
    }
}

//--------------------------------------      Withdrawal     ---------------------------------------------------------
/// An immutable withdrawal history entry. The order number is the hypothetical order the user
/// intends to spend the points on; it does not have to exist in the orders table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Withdrawal {
    #[serde(skip_serializing)]
    pub id: Uuid,
    #[serde(rename = "order")]
    pub order_number: OrderNumber,
    #[serde(rename = "sum")]
    pub value: f64,
    #[serde(with = "timestamp")]
    pub processed_at: DateTime<Utc>,
}

use loyalty_points_engine::db_types::OrderNumber;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawRequest {
    /// Hypothetical order number the points are withdrawn in favour of.
    pub order: OrderNumber,
    pub sum: f64,
}

use core_types::Order;
use serde::{Deserialize, Serialize};

/// The response from `GET /info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoResponse {
    /// Id of the latest trade, to be passed back as the next cursor.
    #[serde(default)]
    pub cursor: Option<i64>,
    /// Only present for a signed-in user.
    #[serde(default)]
    pub traded_orders: Option<Vec<Order>>,
    #[serde(default)]
    pub lowest_sell_price: i64,
    #[serde(default)]
    pub highest_buy_price: i64,
    #[serde(default)]
    pub enable_share: bool,
}

impl InfoResponse {
    pub fn traded_count(&self) -> usize {
        self.traded_orders.as_ref().map_or(0, Vec::len)
    }
}

/// The response from a successful `POST /signin`.
#[derive(Debug, Clone, Deserialize)]
pub struct SigninResponse {
    pub id: i64,
    pub name: String,
}

/// The response from `POST /orders` and `DELETE /order/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdResponse {
    pub id: i64,
}

/// Represents an error body returned by the exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: Option<u16>,
    pub err: String,
}

/// The form posted to `POST /initialize` so the exchange knows where the bank
/// and the audit log live.
#[derive(Debug, Clone, Serialize)]
pub struct InitializeParams {
    pub bank_endpoint: String,
    pub bank_appid: String,
    pub log_endpoint: String,
    pub log_appid: String,
}

impl InitializeParams {
    pub fn from_config(config: &configuration::Config) -> Self {
        Self {
            bank_endpoint: config.bank.endpoint.clone(),
            bank_appid: config.bank.app_id.clone(),
            log_endpoint: config.log.endpoint.clone(),
            log_appid: config.log.app_id.clone(),
        }
    }
}

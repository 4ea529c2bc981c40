use crate::enums::TradeType;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The identity used to drive one exchange client during a run.
///
/// The bank id doubles as the login name on the exchange and as the account key
/// in the bank ledger, so it must be unique per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedUser {
    pub bank_id: String,
    pub name: String,
    pub password: String,
}

impl SimulatedUser {
    pub fn new(
        bank_id: impl Into<String>,
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            bank_id: bank_id.into(),
            name: name.into(),
            password: password.into(),
        }
    }

    /// Derives a bank id such as `asuzuki1539999999@isucon.net` from the clock,
    /// which keeps accounts from colliding with those of earlier runs.
    pub fn bank_id_at(prefix: &str, now: DateTime<Utc>) -> String {
        format!("{}{}@isucon.net", prefix, now.timestamp())
    }

    /// Same bank id, different profile. Used to probe duplicate signups.
    pub fn with_profile(&self, name: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(self.bank_id.clone(), name, password)
    }
}

/// A requested order quantity and limit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub amount: i64,
    pub price: i64,
}

impl OrderSpec {
    pub fn new(amount: i64, price: i64) -> Result<Self, CoreError> {
        if amount <= 0 {
            return Err(CoreError::InvalidInput(
                "amount".to_string(),
                format!("must be positive, got {}", amount),
            ));
        }
        if price <= 0 {
            return Err(CoreError::InvalidInput(
                "price".to_string(),
                format!("must be positive, got {}", price),
            ));
        }
        Ok(Self { amount, price })
    }
}

/// The result of matching orders at a clearing price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub amount: i64,
    pub price: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// An order as reported by `GET /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    #[serde(default)]
    pub user_id: i64,
    pub amount: i64,
    pub price: i64,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub trade_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub trade: Option<Trade>,
}

impl Order {
    /// Builds the local view of an order the exchange just accepted. The exchange
    /// only echoes the id back, the rest comes from the request.
    pub fn accepted(id: i64, trade_type: TradeType, amount: i64, price: i64) -> Self {
        Self {
            id,
            trade_type,
            user_id: 0,
            amount,
            price,
            closed_at: None,
            trade_id: None,
            created_at: None,
            trade: None,
        }
    }

    pub fn is_traded(&self) -> bool {
        self.trade.is_some()
    }

    /// Funds moved by this order's trade, if it has one.
    pub fn traded_value(&self) -> Option<i64> {
        self.trade.as_ref().map(|t| t.price * self.amount)
    }
}

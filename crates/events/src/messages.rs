use crate::error::EventsError;
use core_types::TradeType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The audit log tag attached to every event the exchange emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Signup,
    Signin,
    BuyOrder,
    SellOrder,
    BuyError,
    SellError,
    BuyTrade,
    SellTrade,
    BuyDelete,
    SellDelete,
    Trade,
    /// Any tag this crate does not know about. The raw name survives in the payload.
    Unknown,
}

impl LogTag {
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            "signup" => LogTag::Signup,
            "signin" => LogTag::Signin,
            "buy.order" => LogTag::BuyOrder,
            "sell.order" => LogTag::SellOrder,
            "buy.error" => LogTag::BuyError,
            "sell.error" => LogTag::SellError,
            "buy.trade" => LogTag::BuyTrade,
            "sell.trade" => LogTag::SellTrade,
            "buy.delete" => LogTag::BuyDelete,
            "sell.delete" => LogTag::SellDelete,
            "trade" => LogTag::Trade,
            _ => LogTag::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Signup => "signup",
            LogTag::Signin => "signin",
            LogTag::BuyOrder => "buy.order",
            LogTag::SellOrder => "sell.order",
            LogTag::BuyError => "buy.error",
            LogTag::SellError => "sell.error",
            LogTag::BuyTrade => "buy.trade",
            LogTag::SellTrade => "sell.trade",
            LogTag::BuyDelete => "buy.delete",
            LogTag::SellDelete => "sell.delete",
            LogTag::Trade => "trade",
            LogTag::Unknown => "unknown",
        }
    }

    pub fn order(side: TradeType) -> Self {
        match side {
            TradeType::Buy => LogTag::BuyOrder,
            TradeType::Sell => LogTag::SellOrder,
        }
    }

    pub fn error(side: TradeType) -> Self {
        match side {
            TradeType::Buy => LogTag::BuyError,
            TradeType::Sell => LogTag::SellError,
        }
    }

    pub fn trade(side: TradeType) -> Self {
        match side {
            TradeType::Buy => LogTag::BuyTrade,
            TradeType::Sell => LogTag::SellTrade,
        }
    }

    pub fn delete(side: TradeType) -> Self {
        match side {
            TradeType::Buy => LogTag::BuyDelete,
            TradeType::Sell => LogTag::SellDelete,
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupLog {
    pub name: String,
    pub bank_id: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigninLog {
    pub user_id: i64,
}

/// Payload of `buy.order` / `sell.order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLog {
    pub order_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub price: i64,
}

/// Payload of `buy.error` / `sell.error`: an order that was rejected or
/// cancelled because the bank refused the funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderErrorLog {
    #[serde(default)]
    pub error: String,
    pub user_id: i64,
    pub amount: i64,
    pub price: i64,
}

/// Payload of `buy.trade` / `sell.trade`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTradeLog {
    pub order_id: i64,
    pub user_id: i64,
    pub trade_id: i64,
    pub amount: i64,
    pub price: i64,
}

/// Payload of `buy.delete` / `sell.delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDeleteLog {
    pub order_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub reason: String,
}

/// Payload of `trade`, which is not tied to a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeLog {
    pub trade_id: i64,
    pub amount: i64,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogPayload {
    Signup(SignupLog),
    Signin(SigninLog),
    Order(OrderLog),
    Error(OrderErrorLog),
    OrderTrade(OrderTradeLog),
    Delete(OrderDeleteLog),
    Trade(TradeLog),
    Unknown { tag: String, data: Value },
}

/// A log record exactly as the audit log service returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub tag: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// A typed audit log record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub tag: LogTag,
    pub time: Option<String>,
    pub payload: LogPayload,
}

impl AuditEvent {
    pub fn new(tag: LogTag, payload: LogPayload) -> Self {
        Self {
            tag,
            time: None,
            payload,
        }
    }

    /// The user the event belongs to. `trade` and unknown events have none.
    pub fn user_id(&self) -> Option<i64> {
        match &self.payload {
            LogPayload::Signup(p) => Some(p.user_id),
            LogPayload::Signin(p) => Some(p.user_id),
            LogPayload::Order(p) => Some(p.user_id),
            LogPayload::Error(p) => Some(p.user_id),
            LogPayload::OrderTrade(p) => Some(p.user_id),
            LogPayload::Delete(p) => Some(p.user_id),
            LogPayload::Trade(_) | LogPayload::Unknown { .. } => None,
        }
    }

    pub fn as_signup(&self) -> Option<&SignupLog> {
        match &self.payload {
            LogPayload::Signup(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&OrderErrorLog> {
        match &self.payload {
            LogPayload::Error(p) => Some(p),
            _ => None,
        }
    }
}

fn payload<T: serde::de::DeserializeOwned>(tag: &str, data: Value) -> Result<T, EventsError> {
    serde_json::from_value(data).map_err(|source| EventsError::Payload {
        tag: tag.to_string(),
        source,
    })
}

impl TryFrom<RawEvent> for AuditEvent {
    type Error = EventsError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let tag = LogTag::from_wire(&raw.tag);
        let data = raw.data;
        let payload = match tag {
            LogTag::Signup => LogPayload::Signup(payload(&raw.tag, data)?),
            LogTag::Signin => LogPayload::Signin(payload(&raw.tag, data)?),
            LogTag::BuyOrder | LogTag::SellOrder => LogPayload::Order(payload(&raw.tag, data)?),
            LogTag::BuyError | LogTag::SellError => LogPayload::Error(payload(&raw.tag, data)?),
            LogTag::BuyTrade | LogTag::SellTrade => {
                LogPayload::OrderTrade(payload(&raw.tag, data)?)
            }
            LogTag::BuyDelete | LogTag::SellDelete => LogPayload::Delete(payload(&raw.tag, data)?),
            LogTag::Trade => LogPayload::Trade(payload(&raw.tag, data)?),
            LogTag::Unknown => LogPayload::Unknown {
                tag: raw.tag.clone(),
                data,
            },
        };
        Ok(Self {
            tag,
            time: raw.time,
            payload,
        })
    }
}

//! In-memory stand-ins for the exchange, the bank and the audit log.
//!
//! The fake exchange does no matching. Fills and cancellations are scripted per
//! user and applied when that user next polls `GET /info`, moving funds in the
//! fake bank and appending audit events the way a real exchange would.
#![allow(dead_code)]

use api_client::error::ApiError;
use api_client::{ClientFactory, ExchangeClient, InfoResponse, Method, StatusCode};
use async_trait::async_trait;
use audit_log::{AuditLog, AuditLogError};
use configuration::TesterConfig;
use core_types::{Order, SimulatedUser, Trade, TradeType};
use engine::ScenarioEngine;
use events::{
    AuditEvent, LogPayload, LogTag, OrderDeleteLog, OrderErrorLog, OrderLog, OrderTradeLog,
    SigninLog, SignupLog, TradeLog,
};
use ledger::{Ledger, LedgerError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ways the fake exchange can misbehave.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quirks {
    pub accept_unknown_signin: bool,
    pub skip_bank_check_on_signup: bool,
    pub allow_overdraft: bool,
    /// Lists orders newest first.
    pub reverse_listing: bool,
    /// Settles trades without moving funds in the bank.
    pub skip_settlement_transfer: bool,
    pub drop_trade_logs: bool,
    pub never_settle: bool,
    /// Answers a signup for a taken bank id with success.
    pub accept_duplicate_signup: bool,
    /// Shows guests a traded order on `GET /info`.
    pub leak_guest_trades: bool,
    /// Keeps a buy it rejected for lack of funds on the book.
    pub list_rejected_buy: bool,
    /// Answers `DELETE /order` with success but leaves the order open.
    pub keep_deleted_orders: bool,
    /// Lists every order one unit above its real price.
    pub misreport_listed_price: bool,
    /// Files signin entries under another user's id.
    pub misattribute_signins: bool,
    /// This user's signup fails with a server error.
    pub fail_signup_for: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub enum Action {
    Fill { price: i64 },
    /// Closes the order without a trade, as when the bank reservation fails.
    Cancel,
}

/// Applies `action` to the `ordinal`-th order `user_name` placed on `side`.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub user_name: String,
    pub side: TradeType,
    pub ordinal: usize,
    pub action: Action,
}

impl Settlement {
    fn new(user_name: &str, side: TradeType, ordinal: usize, action: Action) -> Self {
        Self {
            user_name: user_name.to_string(),
            side,
            ordinal,
            action,
        }
    }
}

/// The script that makes the default plan settle the way it expects.
pub fn default_settlements() -> Vec<Settlement> {
    use Action::*;
    use TradeType::*;
    vec![
        Settlement::new("Akira Suzuki", Buy, 0, Cancel),
        Settlement::new("Akira Suzuki", Buy, 3, Fill { price: 99 }),
        Settlement::new("Akira Suzuki", Buy, 4, Fill { price: 100 }),
        Settlement::new("Tony Morris", Sell, 2, Fill { price: 100 }),
        Settlement::new("Tony Morris", Sell, 4, Fill { price: 99 }),
        Settlement::new("Tony Morris", Sell, 5, Fill { price: 99 }),
    ]
}

pub fn fast_tester() -> TesterConfig {
    TesterConfig {
        client_timeout: Duration::from_secs(1),
        retire_timeout: Duration::from_secs(1),
        trade_timeout: Duration::from_millis(200),
        log_timeout: Duration::from_millis(200),
        polling_interval: Duration::from_millis(5),
    }
}

// ---------------------------------------------------------------------------
// Bank
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeBank {
    accounts: Mutex<HashMap<String, i64>>,
    fail_credit: bool,
}

impl FakeBank {
    /// A bank whose `add_credit` always fails.
    pub fn failing_credit() -> Self {
        Self {
            fail_credit: true,
            ..Self::default()
        }
    }

    pub fn has_account(&self, bank_id: &str) -> bool {
        self.accounts.lock().unwrap().contains_key(bank_id)
    }

    pub fn balance(&self, bank_id: &str) -> Option<i64> {
        self.accounts.lock().unwrap().get(bank_id).copied()
    }

    /// Balance of the first account whose id starts with `prefix`.
    pub fn balance_by_prefix(&self, prefix: &str) -> Option<i64> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id.starts_with(prefix))
            .map(|(_, balance)| *balance)
    }

    fn transfer(&self, bank_id: &str, delta: i64) {
        if let Some(balance) = self.accounts.lock().unwrap().get_mut(bank_id) {
            *balance += delta;
        }
    }
}

#[async_trait]
impl Ledger for FakeBank {
    async fn new_bank_id(&self, bank_id: &str) -> Result<(), LedgerError> {
        self.accounts.lock().unwrap().insert(bank_id.to_string(), 0);
        Ok(())
    }

    async fn add_credit(&self, bank_id: &str, amount: i64) -> Result<(), LedgerError> {
        if self.fail_credit {
            return Err(LedgerError::Status {
                path: "/add_credit".to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "bank is down".to_string(),
            });
        }
        match self.accounts.lock().unwrap().get_mut(bank_id) {
            Some(balance) => {
                *balance += amount;
                Ok(())
            }
            None => Err(LedgerError::UnknownAccount(bank_id.to_string())),
        }
    }

    async fn get_credit(&self, bank_id: &str) -> Result<i64, LedgerError> {
        self.balance(bank_id)
            .ok_or_else(|| LedgerError::UnknownAccount(bank_id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeLog {
    by_user: Mutex<HashMap<i64, Vec<AuditEvent>>>,
    market: Mutex<Vec<AuditEvent>>,
}

impl FakeLog {
    fn record(&self, user_id: i64, tag: LogTag, payload: LogPayload) {
        self.by_user
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .push(AuditEvent::new(tag, payload));
    }

    fn record_trade(&self, payload: TradeLog) {
        self.market
            .lock()
            .unwrap()
            .push(AuditEvent::new(LogTag::Trade, LogPayload::Trade(payload)));
    }

    pub fn events_for(&self, user_id: i64) -> Vec<AuditEvent> {
        self.by_user
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn trade_count(&self) -> usize {
        self.market.lock().unwrap().len()
    }
}

#[async_trait]
impl AuditLog for FakeLog {
    async fn get_user_logs(&self, user_id: i64) -> Result<Vec<AuditEvent>, AuditLogError> {
        Ok(self.events_for(user_id))
    }
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

struct Account {
    id: i64,
    name: String,
    password: String,
}

struct Entry {
    order: Order,
    /// Position among the owner's orders on the same side.
    ordinal: usize,
    closed: bool,
}

#[derive(Default)]
struct ExchangeState {
    /// Keyed by bank id.
    users: HashMap<String, Account>,
    orders: Vec<Entry>,
    pending: Vec<Settlement>,
    last_user_id: i64,
    last_order_id: i64,
    last_trade_id: i64,
}

#[derive(Clone)]
pub struct FakeExchange {
    state: Arc<Mutex<ExchangeState>>,
    bank: Arc<FakeBank>,
    log: Arc<FakeLog>,
    quirks: Quirks,
}

impl FakeExchange {
    pub fn new(
        bank: Arc<FakeBank>,
        log: Arc<FakeLog>,
        quirks: Quirks,
        settlements: Vec<Settlement>,
    ) -> Self {
        let state = ExchangeState {
            pending: settlements,
            ..ExchangeState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            bank,
            log,
            quirks,
        }
    }

    pub fn user_id(&self, name: &str) -> Option<i64> {
        let state = self.state.lock().unwrap();
        state.users.values().find(|a| a.name == name).map(|a| a.id)
    }

    /// Orders owned by `name` that carry a trade.
    pub fn traded_count(&self, name: &str) -> usize {
        let Some(user_id) = self.user_id(name) else {
            return 0;
        };
        let state = self.state.lock().unwrap();
        state
            .orders
            .iter()
            .filter(|e| e.order.user_id == user_id && e.order.is_traded())
            .count()
    }

    fn settle(&self, state: &mut ExchangeState, user_id: i64) {
        if self.quirks.never_settle {
            return;
        }
        let Some((bank_id, name)) = state
            .users
            .iter()
            .find(|(_, a)| a.id == user_id)
            .map(|(bank_id, a)| (bank_id.clone(), a.name.clone()))
        else {
            return;
        };

        for settlement in std::mem::take(&mut state.pending) {
            let target = state.orders.iter().position(|e| {
                settlement.user_name == name
                    && e.order.user_id == user_id
                    && e.order.trade_type == settlement.side
                    && e.ordinal == settlement.ordinal
                    && !e.closed
            });
            let Some(index) = target else {
                state.pending.push(settlement);
                continue;
            };

            match settlement.action {
                Action::Cancel => {
                    let entry = &mut state.orders[index];
                    entry.closed = true;
                    self.log.record(
                        user_id,
                        LogTag::error(settlement.side),
                        LogPayload::Error(OrderErrorLog {
                            error: "reserve failed".to_string(),
                            user_id,
                            amount: entry.order.amount,
                            price: entry.order.price,
                        }),
                    );
                }
                Action::Fill { price } => {
                    state.last_trade_id += 1;
                    let trade_id = state.last_trade_id;
                    let entry = &mut state.orders[index];
                    let amount = entry.order.amount;
                    entry.closed = true;
                    entry.order.trade_id = Some(trade_id);
                    entry.order.trade = Some(Trade {
                        id: trade_id,
                        amount,
                        price,
                        created_at: None,
                    });

                    if !self.quirks.skip_settlement_transfer {
                        let delta = match settlement.side {
                            TradeType::Buy => -price * amount,
                            TradeType::Sell => price * amount,
                        };
                        self.bank.transfer(&bank_id, delta);
                    }
                    if !self.quirks.drop_trade_logs {
                        self.log.record(
                            user_id,
                            LogTag::trade(settlement.side),
                            LogPayload::OrderTrade(OrderTradeLog {
                                order_id: entry.order.id,
                                user_id,
                                trade_id,
                                amount,
                                price,
                            }),
                        );
                    }
                    self.log.record_trade(TradeLog {
                        trade_id,
                        amount,
                        price,
                    });
                }
            }
        }
    }
}

impl ClientFactory for FakeExchange {
    fn connect(&self, user: &SimulatedUser) -> Result<Arc<dyn ExchangeClient>, ApiError> {
        Ok(Arc::new(FakeClient {
            exchange: self.clone(),
            user: user.clone(),
            session: Mutex::new(None),
        }))
    }
}

pub struct FakeClient {
    exchange: FakeExchange,
    user: SimulatedUser,
    session: Mutex<Option<i64>>,
}

impl FakeClient {
    fn session(&self, method: Method, path: &str) -> Result<i64, ApiError> {
        self.session
            .lock()
            .unwrap()
            .ok_or_else(|| ApiError::status_only(method, path, StatusCode::UNAUTHORIZED))
    }

    fn store_order(&self, user_id: i64, trade_type: TradeType, amount: i64, price: i64) -> Order {
        let exchange = &self.exchange;
        let mut state = exchange.state.lock().unwrap();
        state.last_order_id += 1;
        let id = state.last_order_id;
        let ordinal = state
            .orders
            .iter()
            .filter(|e| e.order.user_id == user_id && e.order.trade_type == trade_type)
            .count();
        let mut order = Order::accepted(id, trade_type, amount, price);
        order.user_id = user_id;
        state.orders.push(Entry {
            order: order.clone(),
            ordinal,
            closed: false,
        });
        exchange.log.record(
            user_id,
            LogTag::order(trade_type),
            LogPayload::Order(OrderLog {
                order_id: id,
                user_id,
                amount,
                price,
            }),
        );
        order
    }
}

#[async_trait]
impl ExchangeClient for FakeClient {
    fn user(&self) -> &SimulatedUser {
        &self.user
    }

    fn user_id(&self) -> Option<i64> {
        *self.session.lock().unwrap()
    }

    async fn top(&self) -> Result<(), ApiError> {
        Ok(())
    }

    async fn info(&self, cursor: i64) -> Result<InfoResponse, ApiError> {
        let session = *self.session.lock().unwrap();
        let mut state = self.exchange.state.lock().unwrap();
        let traded_orders = match session {
            Some(user_id) => {
                self.exchange.settle(&mut state, user_id);
                Some(
                    state
                        .orders
                        .iter()
                        .filter(|e| e.order.user_id == user_id)
                        .filter(|e| e.order.trade_id.is_some_and(|id| id > cursor))
                        .map(|e| e.order.clone())
                        .collect::<Vec<_>>(),
                )
            }
            None if self.exchange.quirks.leak_guest_trades => {
                let mut order = Order::accepted(1, TradeType::Buy, 1, 100);
                order.trade_id = Some(1);
                Some(vec![order])
            }
            None => None,
        };
        Ok(InfoResponse {
            cursor: Some(state.last_trade_id),
            traded_orders,
            ..InfoResponse::default()
        })
    }

    async fn signup(&self) -> Result<(), ApiError> {
        let exchange = &self.exchange;
        let failed = |status| ApiError::status_only(Method::POST, "/signup", status);
        if exchange.quirks.fail_signup_for == Some(self.user.name.as_str()) {
            return Err(failed(StatusCode::INTERNAL_SERVER_ERROR));
        }
        let bank_checked = !exchange.quirks.skip_bank_check_on_signup;
        if bank_checked && !exchange.bank.has_account(&self.user.bank_id) {
            return Err(failed(StatusCode::NOT_FOUND));
        }
        let mut state = exchange.state.lock().unwrap();
        if state.users.contains_key(&self.user.bank_id) {
            if exchange.quirks.accept_duplicate_signup {
                return Ok(());
            }
            return Err(failed(StatusCode::CONFLICT));
        }
        state.last_user_id += 1;
        let id = state.last_user_id;
        state.users.insert(
            self.user.bank_id.clone(),
            Account {
                id,
                name: self.user.name.clone(),
                password: self.user.password.clone(),
            },
        );
        exchange.log.record(
            id,
            LogTag::Signup,
            LogPayload::Signup(SignupLog {
                name: self.user.name.clone(),
                bank_id: self.user.bank_id.clone(),
                user_id: id,
            }),
        );
        Ok(())
    }

    async fn signin(&self) -> Result<(), ApiError> {
        let state = self.exchange.state.lock().unwrap();
        match state.users.get(&self.user.bank_id) {
            Some(account) if account.password == self.user.password => {
                *self.session.lock().unwrap() = Some(account.id);
                let logged_id = if self.exchange.quirks.misattribute_signins {
                    account.id + 100
                } else {
                    account.id
                };
                self.exchange.log.record(
                    account.id,
                    LogTag::Signin,
                    LogPayload::Signin(SigninLog { user_id: logged_id }),
                );
                Ok(())
            }
            _ if self.exchange.quirks.accept_unknown_signin => Ok(()),
            _ => Err(ApiError::status_only(Method::POST, "/signin", StatusCode::NOT_FOUND)),
        }
    }

    async fn signout(&self) -> Result<(), ApiError> {
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    async fn add_order(
        &self,
        trade_type: TradeType,
        amount: i64,
        price: i64,
    ) -> Result<Order, ApiError> {
        let user_id = self.session(Method::POST, "/orders")?;
        let rejected = || ApiError::status_only(Method::POST, "/orders", StatusCode::BAD_REQUEST);
        if amount <= 0 || price <= 0 {
            return Err(rejected());
        }

        let exchange = &self.exchange;
        if trade_type == TradeType::Buy && !exchange.quirks.allow_overdraft {
            let balance = exchange.bank.balance(&self.user.bank_id).unwrap_or(0);
            if amount * price > balance {
                exchange.log.record(
                    user_id,
                    LogTag::BuyError,
                    LogPayload::Error(OrderErrorLog {
                        error: "銀行の残高が足りません".to_string(),
                        user_id,
                        amount,
                        price,
                    }),
                );
                if exchange.quirks.list_rejected_buy {
                    self.store_order(user_id, trade_type, amount, price);
                }
                return Err(rejected());
            }
        }

        Ok(self.store_order(user_id, trade_type, amount, price))
    }

    async fn get_orders(&self) -> Result<Vec<Order>, ApiError> {
        let user_id = self.session(Method::GET, "/orders")?;
        let state = self.exchange.state.lock().unwrap();
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|e| e.order.user_id == user_id && (!e.closed || e.order.is_traded()))
            .map(|e| e.order.clone())
            .collect();
        if self.exchange.quirks.reverse_listing {
            orders.reverse();
        }
        if self.exchange.quirks.misreport_listed_price {
            for order in &mut orders {
                order.price += 1;
            }
        }
        Ok(orders)
    }

    async fn delete_order(&self, order_id: i64) -> Result<(), ApiError> {
        let path = format!("/order/{}", order_id);
        let user_id = self.session(Method::DELETE, &path)?;
        let mut state = self.exchange.state.lock().unwrap();
        let entry = state
            .orders
            .iter_mut()
            .find(|e| e.order.id == order_id && e.order.user_id == user_id && !e.closed)
            .ok_or_else(|| ApiError::status_only(Method::DELETE, &path, StatusCode::NOT_FOUND))?;
        if !self.exchange.quirks.keep_deleted_orders {
            entry.closed = true;
        }
        let side = entry.order.trade_type;
        self.exchange.log.record(
            user_id,
            LogTag::delete(side),
            LogPayload::Delete(OrderDeleteLog {
                order_id,
                user_id,
                reason: "canceled".to_string(),
            }),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct World {
    pub exchange: FakeExchange,
    pub bank: Arc<FakeBank>,
    pub log: Arc<FakeLog>,
}

impl World {
    pub fn new(quirks: Quirks) -> Self {
        Self::with_bank(quirks, FakeBank::default())
    }

    pub fn with_bank(quirks: Quirks, bank: FakeBank) -> Self {
        let bank = Arc::new(bank);
        let log = Arc::new(FakeLog::default());
        let exchange = FakeExchange::new(
            Arc::clone(&bank),
            Arc::clone(&log),
            quirks,
            default_settlements(),
        );
        Self {
            exchange,
            bank,
            log,
        }
    }

    pub fn engine(&self) -> ScenarioEngine {
        ScenarioEngine::new(
            Arc::new(self.exchange.clone()),
            self.bank.clone(),
            self.log.clone(),
            fast_tester(),
        )
    }
}

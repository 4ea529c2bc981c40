use crate::error::ScenarioError;
use chrono::{DateTime, Utc};
use core_types::{OrderSpec, SimulatedUser, TradeType};

/// Who a simulated user is, minus the per-run bank id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Prepended to the run timestamp to form the bank id.
    pub bank_id_prefix: String,
    pub name: String,
    pub password: String,
}

impl UserProfile {
    pub fn new(bank_id_prefix: &str, name: &str, password: &str) -> Self {
        Self {
            bank_id_prefix: bank_id_prefix.to_string(),
            name: name.to_string(),
            password: password.to_string(),
        }
    }

    pub fn user_at(&self, now: DateTime<Utc>) -> SimulatedUser {
        SimulatedUser::new(
            SimulatedUser::bank_id_at(&self.bank_id_prefix, now),
            self.name.clone(),
            self.password.clone(),
        )
    }
}

/// What one user does during the trading phase, and what must be true afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackPlan {
    pub side: TradeType,
    /// Deposited into the user's bank account before any order is placed.
    pub credit: i64,
    /// Placed in this order, all on `side`.
    pub orders: Vec<OrderSpec>,
    /// `GET /info` must report at least this many traded orders for the user.
    pub expected_traded: usize,
    /// Exact length of `GET /orders` once trading has settled.
    pub expected_listing_len: usize,
    /// Indices into `GET /orders` that must carry a trade. No other entry may.
    pub settled_positions: Vec<usize>,
    pub min_order_events: usize,
    pub min_trade_events: usize,
    pub min_error_events: usize,
    /// When set, the user's first `<side>.error` log entry must carry this
    /// amount and price.
    pub first_error: Option<OrderSpec>,
}

impl TrackPlan {
    /// The buying user's default track.
    ///
    /// The first error logged for the buyer is the rejected insufficient-funds
    /// probe, hence `first_error`.
    pub fn buyer() -> Self {
        Self {
            side: TradeType::Buy,
            credit: 550,
            orders: specs(&[(5, 100), (2, 80), (1, 90), (3, 99), (2, 100)]),
            expected_traded: 2,
            expected_listing_len: 4,
            settled_positions: vec![2, 3],
            min_order_events: 5,
            min_trade_events: 2,
            min_error_events: 2,
            first_error: Some(OrderSpec {
                amount: 1,
                price: 2000,
            }),
        }
    }

    pub fn seller() -> Self {
        Self {
            side: TradeType::Sell,
            credit: 0,
            orders: specs(&[(6, 100), (2, 105), (3, 100), (7, 99), (1, 99), (1, 99)]),
            expected_traded: 3,
            expected_listing_len: 6,
            settled_positions: vec![2, 4, 5],
            min_order_events: 6,
            min_trade_events: 3,
            min_error_events: 0,
            first_error: None,
        }
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.credit < 0 {
            return Err(plan_error(self.side, "credit must not be negative"));
        }
        for spec in &self.orders {
            OrderSpec::new(spec.amount, spec.price)
                .map_err(|e| plan_error(self.side, &e.to_string()))?;
        }
        if self.expected_listing_len > self.orders.len() {
            return Err(plan_error(
                self.side,
                "expects a longer order listing than orders it places",
            ));
        }
        if let Some(&position) = self
            .settled_positions
            .iter()
            .find(|&&p| p >= self.expected_listing_len)
        {
            return Err(plan_error(
                self.side,
                &format!("settled position {} is outside the listing", position),
            ));
        }
        let mut sorted = self.settled_positions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != self.settled_positions.len() {
            return Err(plan_error(self.side, "settled positions repeat"));
        }
        Ok(())
    }
}

fn specs(pairs: &[(i64, i64)]) -> Vec<OrderSpec> {
    pairs
        .iter()
        .map(|&(amount, price)| OrderSpec { amount, price })
        .collect()
}

fn plan_error(side: TradeType, message: &str) -> ScenarioError {
    ScenarioError::Plan(format!("{} track: {}", side, message))
}

/// Everything a run does, as data. `Default` is the standard conformance scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPlan {
    /// Also drives the negative checks and the pre-flight probes.
    pub buyer: UserProfile,
    pub seller: UserProfile,
    /// Name and password used for the conflicting signup with the buyer's bank id.
    pub conflicting_name: String,
    pub conflicting_password: String,
    /// A buy priced well beyond the buyer's empty account.
    pub insufficient_funds_probe: OrderSpec,
    pub round_trip_sell: OrderSpec,
    pub buy_track: TrackPlan,
    pub sell_track: TrackPlan,
}

impl Default for ScenarioPlan {
    fn default() -> Self {
        Self {
            buyer: UserProfile::new("asuzuki", "Akira Suzuki", "1234567890abc"),
            seller: UserProfile::new("tmorris", "Tony Morris", "234567890abcd"),
            conflicting_name: "Akio Suzuki".to_string(),
            conflicting_password: "13467890abc".to_string(),
            insufficient_funds_probe: OrderSpec {
                amount: 1,
                price: 2000,
            },
            round_trip_sell: OrderSpec {
                amount: 1,
                price: 2000,
            },
            buy_track: TrackPlan::buyer(),
            sell_track: TrackPlan::seller(),
        }
    }
}

impl ScenarioPlan {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.buyer.bank_id_prefix == self.seller.bank_id_prefix {
            return Err(ScenarioError::Plan(
                "buyer and seller would share a bank id".to_string(),
            ));
        }
        for probe in [self.insufficient_funds_probe, self.round_trip_sell] {
            OrderSpec::new(probe.amount, probe.price)
                .map_err(|e| ScenarioError::Plan(e.to_string()))?;
        }
        if self.buy_track.side != TradeType::Buy || self.sell_track.side != TradeType::Sell {
            return Err(ScenarioError::Plan(
                "buy and sell tracks are on the wrong sides".to_string(),
            ));
        }
        self.buy_track.validate()?;
        self.sell_track.validate()
    }
}

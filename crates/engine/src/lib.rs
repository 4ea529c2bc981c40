//! # Engine
//!
//! The scenario engine drives two simulated users through a fixed sequence of
//! phases against a live exchange, and checks what it observes against the
//! bank ledger and the audit log. The first failing check ends the run.

use crate::checks::{ensure_eq, expect_status};
use crate::error::api;
use api_client::{ClientFactory, ExchangeClient, StatusCode};
use audit_log::AuditLog;
use chrono::Utc;
use configuration::TesterConfig;
use core_types::{SimulatedUser, TradeType};
use futures::future::join_all;
use ledger::Ledger;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub mod checks;
pub mod error;
pub mod phase;
pub mod plan;
pub mod reconciler;
pub mod tracks;
pub mod waiter;

pub use error::{RunError, ScenarioError};
pub use phase::Phase;
pub use plan::{ScenarioPlan, TrackPlan, UserProfile};
pub use tracks::Track;
pub use waiter::wait_until;

/// Runs the conformance scenario against one exchange.
pub struct ScenarioEngine {
    clients: Arc<dyn ClientFactory>,
    ledger: Arc<dyn Ledger>,
    audit_log: Arc<dyn AuditLog>,
    tester: TesterConfig,
    plan: ScenarioPlan,
}

impl ScenarioEngine {
    /// Creates an engine running the default `ScenarioPlan`.
    pub fn new(
        clients: Arc<dyn ClientFactory>,
        ledger: Arc<dyn Ledger>,
        audit_log: Arc<dyn AuditLog>,
        tester: TesterConfig,
    ) -> Self {
        Self {
            clients,
            ledger,
            audit_log,
            tester,
            plan: ScenarioPlan::default(),
        }
    }

    pub fn with_plan(mut self, plan: ScenarioPlan) -> Result<Self, ScenarioError> {
        plan.validate()?;
        self.plan = plan;
        Ok(self)
    }

    /// Executes every phase in order and stops at the first failure.
    pub async fn run(&self) -> Result<(), RunError> {
        let now = Utc::now();
        let buyer = self.plan.buyer.user_at(now);
        let seller = self.plan.seller.user_at(now);
        tracing::info!(buyer = %buyer.bank_id, seller = %seller.bank_id, "scenario started");

        let c1 = self.connect(&buyer).map_err(in_phase(Phase::AnonymousAccess))?;
        let c2 = self.connect(&seller).map_err(in_phase(Phase::AnonymousAccess))?;

        run_phase(Phase::AnonymousAccess, self.anonymous_access(c2.as_ref())).await?;
        run_phase(Phase::NegativeAuth, self.negative_auth(c1.as_ref())).await?;
        run_phase(Phase::LedgerProvisioning, self.provision(&[&buyer, &seller])).await?;
        run_phase(Phase::Onboarding, self.onboard(&[&c1, &c2])).await?;
        run_phase(Phase::DuplicateSignup, self.duplicate_signup(&buyer)).await?;
        run_phase(Phase::InsufficientFunds, self.insufficient_funds(c1.as_ref())).await?;
        run_phase(Phase::SellCancelRoundTrip, self.sell_cancel_round_trip(c1.as_ref())).await?;
        run_phase(Phase::TradingTracks, self.trading_tracks(&c1, &c2)).await?;
        run_phase(Phase::PostFlight, async { Ok(()) }).await?;

        tracing::info!("scenario passed");
        Ok(())
    }

    fn connect(&self, user: &SimulatedUser) -> Result<Arc<dyn ExchangeClient>, ScenarioError> {
        self.clients.connect(user).map_err(|source| ScenarioError::Api {
            context: format!("connecting as {}", user.bank_id),
            source,
        })
    }

    async fn anonymous_access(&self, client: &dyn ExchangeClient) -> Result<(), ScenarioError> {
        client.top().await.map_err(api("GET /"))?;
        let info = client.info(0).await.map_err(api("GET /info"))?;
        ensure_eq("traded orders for a guest", info.traded_count(), 0)
    }

    async fn negative_auth(&self, client: &dyn ExchangeClient) -> Result<(), ScenarioError> {
        expect_status(
            "POST /signin with an unregistered account",
            client.signin().await,
            StatusCode::NOT_FOUND,
        )?;
        expect_status(
            "POST /signup with a bank id the bank does not know",
            client.signup().await,
            StatusCode::NOT_FOUND,
        )
    }

    async fn provision(&self, users: &[&SimulatedUser]) -> Result<(), ScenarioError> {
        for user in users {
            self.ledger.new_bank_id(&user.bank_id).await?;
        }
        Ok(())
    }

    async fn onboard(&self, clients: &[&Arc<dyn ExchangeClient>]) -> Result<(), ScenarioError> {
        let tasks: Vec<JoinHandle<Result<(), ScenarioError>>> = clients
            .iter()
            .map(|client| tokio::spawn(onboard_user(Arc::clone(*client))))
            .collect();
        first_failure(join_all(tasks).await)
    }

    async fn duplicate_signup(&self, user: &SimulatedUser) -> Result<(), ScenarioError> {
        let impostor = user.with_profile(
            self.plan.conflicting_name.clone(),
            self.plan.conflicting_password.clone(),
        );
        let client = self.connect(&impostor)?;
        expect_status(
            "POST /signup with a bank id that is already taken",
            client.signup().await,
            StatusCode::CONFLICT,
        )
    }

    async fn insufficient_funds(&self, client: &dyn ExchangeClient) -> Result<(), ScenarioError> {
        let probe = self.plan.insufficient_funds_probe;
        expect_status(
            "POST /orders buying more than the bank balance covers",
            client.add_order(TradeType::Buy, probe.amount, probe.price).await,
            StatusCode::BAD_REQUEST,
        )?;
        let orders = client.get_orders().await.map_err(api("GET /orders"))?;
        ensure_eq("GET /orders length after a rejected buy", orders.len(), 0)
    }

    async fn sell_cancel_round_trip(
        &self,
        client: &dyn ExchangeClient,
    ) -> Result<(), ScenarioError> {
        let spec = self.plan.round_trip_sell;
        let placed = client
            .add_order(TradeType::Sell, spec.amount, spec.price)
            .await
            .map_err(api("POST /orders"))?;

        let orders = client.get_orders().await.map_err(api("GET /orders"))?;
        ensure_eq("GET /orders length after one sell", orders.len(), 1)?;
        let listed = &orders[0];
        ensure_eq("listed order id", listed.id, placed.id)?;
        ensure_eq("listed order type", listed.trade_type, TradeType::Sell)?;
        ensure_eq("listed order amount", listed.amount, spec.amount)?;
        ensure_eq("listed order price", listed.price, spec.price)?;

        client
            .delete_order(placed.id)
            .await
            .map_err(api("DELETE /order"))?;
        let orders = client.get_orders().await.map_err(api("GET /orders"))?;
        ensure_eq("GET /orders length after cancelling", orders.len(), 0)
    }

    async fn trading_tracks(
        &self,
        buyer: &Arc<dyn ExchangeClient>,
        seller: &Arc<dyn ExchangeClient>,
    ) -> Result<(), ScenarioError> {
        let tracks = [
            (buyer, self.plan.buy_track.clone()),
            (seller, self.plan.sell_track.clone()),
        ];
        let tasks: Vec<JoinHandle<Result<(), ScenarioError>>> = tracks
            .into_iter()
            .map(|(client, plan)| {
                let track = Track {
                    client: Arc::clone(client),
                    ledger: Arc::clone(&self.ledger),
                    audit_log: Arc::clone(&self.audit_log),
                    tester: self.tester.clone(),
                    plan,
                };
                tokio::spawn(track.run())
            })
            .collect();
        first_failure(join_all(tasks).await)
    }
}

async fn onboard_user(client: Arc<dyn ExchangeClient>) -> Result<(), ScenarioError> {
    client.top().await.map_err(api("GET /"))?;
    client.info(0).await.map_err(api("GET /info"))?;
    client.signup().await.map_err(api("POST /signup"))?;
    client.signin().await.map_err(api("POST /signin"))?;
    let orders = client.get_orders().await.map_err(api("GET /orders"))?;
    ensure_eq("GET /orders length for a new user", orders.len(), 0)?;
    tracing::debug!(bank_id = %client.user().bank_id, "user onboarded");
    Ok(())
}

/// Waits for every task's outcome, then reports the first failure in task order.
fn first_failure(
    outcomes: Vec<Result<Result<(), ScenarioError>, tokio::task::JoinError>>,
) -> Result<(), ScenarioError> {
    let mut first = None;
    for outcome in outcomes {
        let failure = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e,
            Err(join) => ScenarioError::Task(join),
        };
        if first.is_none() {
            first = Some(failure);
        } else {
            tracing::warn!(error = %failure, "additional user task failed");
        }
    }
    first.map_or(Ok(()), Err)
}

fn in_phase(phase: Phase) -> impl FnOnce(ScenarioError) -> RunError {
    move |source| RunError { phase, source }
}

async fn run_phase<F>(phase: Phase, step: F) -> Result<(), RunError>
where
    F: Future<Output = Result<(), ScenarioError>>,
{
    let started = Instant::now();
    match step.await {
        Ok(()) => {
            tracing::info!(%phase, elapsed = ?started.elapsed(), "phase passed");
            Ok(())
        }
        Err(source) => Err(RunError { phase, source }),
    }
}

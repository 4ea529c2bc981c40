use crate::checks::{LogExpectation, check_user_logs};
use crate::error::{ScenarioError, api};
use crate::plan::TrackPlan;
use crate::reconciler::reconcile_track;
use crate::waiter::wait_until;
use api_client::ExchangeClient;
use audit_log::AuditLog;
use configuration::TesterConfig;
use core_types::OrderSpec;
use ledger::Ledger;
use std::sync::Arc;

/// One user's part of the trading phase. Owns its handles so it can run on
/// its own task.
pub struct Track {
    pub client: Arc<dyn ExchangeClient>,
    pub ledger: Arc<dyn Ledger>,
    pub audit_log: Arc<dyn AuditLog>,
    pub tester: TesterConfig,
    pub plan: TrackPlan,
}

impl Track {
    pub async fn run(self) -> Result<(), ScenarioError> {
        let user = self.client.user().clone();
        tracing::info!(
            bank_id = %user.bank_id,
            side = %self.plan.side,
            orders = self.plan.orders.len(),
            "trading track started"
        );

        if self.plan.credit > 0 {
            self.ledger.add_credit(&user.bank_id, self.plan.credit).await?;
        }

        for spec in &self.plan.orders {
            self.place(*spec).await?;
        }

        let client = &self.client;
        let expected = self.plan.expected_traded;
        wait_until(
            "expected trade did not settle",
            self.tester.polling_interval,
            self.tester.trade_timeout,
            || async move {
                let info = client.info(0).await.map_err(api("GET /info"))?;
                let traded = info.traded_count();
                tracing::debug!(traded, expected, "polled traded orders");
                Ok(traded >= expected)
            },
        )
        .await?;

        reconcile_track(self.client.as_ref(), self.ledger.as_ref(), &self.plan).await?;

        let user_id = self.client.user_id().ok_or_else(|| {
            ScenarioError::assertion(format!("{} has no exchange user id", user.bank_id))
        })?;
        let expect = LogExpectation::for_track(&user, user_id, &self.plan);
        let audit_log = &self.audit_log;
        let expect = &expect;
        wait_until(
            "audit log did not converge",
            self.tester.polling_interval,
            self.tester.log_timeout,
            || async move {
                let events = audit_log.get_user_logs(user_id).await?;
                check_user_logs(&events, expect)
            },
        )
        .await?;

        tracing::info!(
            bank_id = %user.bank_id,
            side = %self.plan.side,
            "trading track passed"
        );
        Ok(())
    }

    /// Places one order and checks it is listed last.
    async fn place(&self, spec: OrderSpec) -> Result<(), ScenarioError> {
        let context = format!("POST /orders ({} {}@{})", self.plan.side, spec.amount, spec.price);
        let order = self
            .client
            .add_order(self.plan.side, spec.amount, spec.price)
            .await
            .map_err(api(&context))?;

        let orders = self.client.get_orders().await.map_err(api("GET /orders"))?;
        match orders.last() {
            Some(last) if last.id == order.id => Ok(()),
            Some(last) => Err(ScenarioError::assertion(format!(
                "GET /orders is not ordered by creation: order {} was just placed but order {} is listed last",
                order.id, last.id
            ))),
            None => Err(ScenarioError::assertion(format!(
                "GET /orders does not list order {} that was just placed",
                order.id
            ))),
        }
    }
}

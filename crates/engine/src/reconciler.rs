use crate::checks::ensure_eq;
use crate::error::{ScenarioError, api};
use crate::plan::TrackPlan;
use api_client::ExchangeClient;
use core_types::{Order, TradeType};
use ledger::Ledger;

/// Checks a settled listing against the plan and returns the total traded
/// value of the entries that settled.
pub fn settled_total(orders: &[Order], plan: &TrackPlan) -> Result<i64, ScenarioError> {
    ensure_eq("GET /orders length", orders.len(), plan.expected_listing_len)?;

    let mut total = 0;
    for (position, order) in orders.iter().enumerate() {
        let should_settle = plan.settled_positions.contains(&position);
        match (should_settle, order.traded_value()) {
            (true, Some(value)) => total += value,
            (true, None) => {
                return Err(ScenarioError::assertion(format!(
                    "GET /orders[{}] (order {}) should carry a trade but has none",
                    position, order.id
                )));
            }
            (false, Some(_)) => {
                return Err(ScenarioError::assertion(format!(
                    "GET /orders[{}] (order {}) carries a trade it should not have",
                    position, order.id
                )));
            }
            (false, None) => {}
        }
    }
    Ok(total)
}

/// Compares the bank balance with what the track put in and traded.
///
/// A buyer's balance plus the cost of its trades must equal what was credited.
/// A seller's balance must equal what was credited plus its proceeds.
pub fn check_balance(
    side: TradeType,
    credit: i64,
    total: i64,
    balance: i64,
) -> Result<(), ScenarioError> {
    if balance < 0 {
        return Err(ScenarioError::assertion(format!(
            "bank balance is negative ({})",
            balance
        )));
    }
    let reconciles = match side {
        TradeType::Buy => balance + total == credit,
        TradeType::Sell => balance == credit + total,
    };
    if reconciles {
        Ok(())
    } else {
        Err(ScenarioError::assertion(format!(
            "bank balance does not reconcile for the {} track [balance: {}, credited: {}, traded: {}]",
            side, balance, credit, total
        )))
    }
}

/// Re-reads the user's listing and balance and reconciles the two.
pub async fn reconcile_track(
    client: &dyn ExchangeClient,
    ledger: &dyn Ledger,
    plan: &TrackPlan,
) -> Result<(), ScenarioError> {
    let orders = client.get_orders().await.map_err(api("GET /orders"))?;
    let total = settled_total(&orders, plan)?;

    let bank_id = &client.user().bank_id;
    let balance = ledger.get_credit(bank_id).await?;
    check_balance(plan.side, plan.credit, total, balance)?;

    tracing::info!(bank_id = %bank_id, side = %plan.side, total, balance, "track reconciled");
    Ok(())
}

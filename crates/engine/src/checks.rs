use crate::error::ScenarioError;
use crate::plan::TrackPlan;
use api_client::StatusCode;
use api_client::error::ApiError;
use core_types::{OrderSpec, SimulatedUser, TradeType};
use events::{AuditEvent, LogTag, filter_events};
use std::fmt::Debug;

/// Requires `result` to be an exchange error with exactly `expected` status.
/// Success, transport errors and other statuses all fail the check.
pub fn expect_status<T: Debug>(
    what: &str,
    result: Result<T, ApiError>,
    expected: StatusCode,
) -> Result<(), ScenarioError> {
    match result {
        Ok(value) => Err(ScenarioError::assertion(format!(
            "{} succeeded but should have failed with {} (got {:?})",
            what, expected, value
        ))),
        Err(err) => match err.status() {
            Some(status) if status == expected => Ok(()),
            Some(status) => Err(ScenarioError::assertion(format!(
                "{} should fail with {} but failed with {}: {}",
                what, expected, status, err
            ))),
            None => Err(ScenarioError::Api {
                context: what.to_string(),
                source: err,
            }),
        },
    }
}

pub fn ensure_eq<T: PartialEq + Debug>(what: &str, got: T, want: T) -> Result<(), ScenarioError> {
    if got == want {
        Ok(())
    } else {
        Err(ScenarioError::assertion(format!(
            "{} is wrong [got: {:?}, want: {:?}]",
            what, got, want
        )))
    }
}

/// The audit trail one trading track must leave behind.
#[derive(Debug, Clone)]
pub struct LogExpectation {
    pub user_id: i64,
    pub name: String,
    pub bank_id: String,
    pub side: TradeType,
    pub min_order_events: usize,
    pub min_trade_events: usize,
    pub min_error_events: usize,
    pub first_error: Option<OrderSpec>,
}

impl LogExpectation {
    pub fn for_track(user: &SimulatedUser, user_id: i64, plan: &TrackPlan) -> Self {
        Self {
            user_id,
            name: user.name.clone(),
            bank_id: user.bank_id.clone(),
            side: plan.side,
            min_order_events: plan.min_order_events,
            min_trade_events: plan.min_trade_events,
            min_error_events: plan.min_error_events,
            first_error: plan.first_error,
        }
    }
}

/// Evaluates a user's audit log against `expect`.
///
/// `Ok(false)` means the log is still incomplete and is worth polling again.
/// Entries that are present but wrong can never become right, so those are
/// returned as errors. That includes an entry filed under another user.
pub fn check_user_logs(
    events: &[AuditEvent],
    expect: &LogExpectation,
) -> Result<bool, ScenarioError> {
    for event in events {
        if let Some(owner) = event.user_id().filter(|&id| id != expect.user_id) {
            return Err(ScenarioError::assertion(format!(
                "{} log for user {} belongs to user {}",
                event.tag, expect.user_id, owner
            )));
        }
    }

    let Some(signup) = filter_events(events, LogTag::Signup)
        .into_iter()
        .find_map(AuditEvent::as_signup)
    else {
        return Ok(false);
    };
    ensure_eq("signup log name", signup.name.as_str(), expect.name.as_str())?;
    ensure_eq(
        "signup log bank_id",
        signup.bank_id.as_str(),
        expect.bank_id.as_str(),
    )?;

    if filter_events(events, LogTag::Signin).is_empty() {
        return Ok(false);
    }

    let errors = filter_events(events, LogTag::error(expect.side));
    if let (Some(want), Some(first)) = (
        expect.first_error,
        errors.iter().find_map(|e| e.as_error()),
    ) {
        let tag = LogTag::error(expect.side);
        ensure_eq(&format!("first {} log amount", tag), first.amount, want.amount)?;
        ensure_eq(&format!("first {} log price", tag), first.price, want.price)?;
    }
    if errors.len() < expect.min_error_events {
        return Ok(false);
    }

    let orders = filter_events(events, LogTag::order(expect.side)).len();
    let trades = filter_events(events, LogTag::trade(expect.side)).len();
    Ok(orders >= expect.min_order_events && trades >= expect.min_trade_events)
}

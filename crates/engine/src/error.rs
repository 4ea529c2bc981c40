use crate::phase::Phase;
use api_client::error::ApiError;
use audit_log::AuditLogError;
use ledger::LedgerError;
use std::time::Duration;
use thiserror::Error;

/// Why a phase of the scenario failed.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// The exchange answered, but not the way a conforming exchange must.
    #[error("{0}")]
    Assertion(String),

    #[error("{what} (gave up after {after:?})")]
    Timeout { what: String, after: Duration },

    /// An exchange call failed where it was expected to succeed.
    #[error("{context} failed: {source}")]
    Api {
        context: String,
        #[source]
        source: ApiError,
    },

    #[error("Bank ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Audit log error: {0}")]
    AuditLog(#[from] AuditLogError),

    #[error("User task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid scenario plan: {0}")]
    Plan(String),
}

impl ScenarioError {
    pub fn assertion(message: impl Into<String>) -> Self {
        ScenarioError::Assertion(message.into())
    }
}

/// The error returned by `ScenarioEngine::run`: the first failure, tagged with
/// the phase it happened in.
#[derive(Error, Debug)]
#[error("{phase} failed: {source}")]
pub struct RunError {
    pub phase: Phase,
    #[source]
    pub source: ScenarioError,
}

/// Wraps an exchange failure with the call that produced it, for `map_err`.
pub(crate) fn api(context: &str) -> impl FnOnce(ApiError) -> ScenarioError + '_ {
    move |source| ScenarioError::Api {
        context: context.to_string(),
        source,
    }
}

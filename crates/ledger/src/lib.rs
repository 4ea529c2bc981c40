//! # Ledger
//!
//! The bank is the ground truth for account balances. The scenario engine uses it
//! to open accounts for its simulated users, to deposit funds, and to read
//! balances back when reconciling the exchange's settled trades.
//!
//! The exchange settles against the same bank on its own; those movements are
//! only ever observed here through `get_credit`.

use async_trait::async_trait;
use configuration::CollaboratorConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod error;

pub use error::LedgerError;

/// The operations the engine needs from the bank. Implementations must be safe
/// to call from concurrent tasks.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Opens an account so the exchange can verify `bank_id` on signup.
    async fn new_bank_id(&self, bank_id: &str) -> Result<(), LedgerError>;

    /// Deposits `amount` into the account, simulating an external transfer.
    async fn add_credit(&self, bank_id: &str, amount: i64) -> Result<(), LedgerError>;

    /// Reads the current balance.
    async fn get_credit(&self, bank_id: &str) -> Result<i64, LedgerError>;
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    bank_id: &'a str,
}

#[derive(Debug, Serialize)]
struct AddCreditRequest<'a> {
    bank_id: &'a str,
    price: i64,
}

#[derive(Debug, Deserialize)]
struct CreditResponse {
    credit: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// A client for the isubank account API.
pub struct IsubankClient {
    client: Client,
    endpoint: String,
    app_id: String,
}

impl IsubankClient {
    /// Every request is abandoned after `timeout`.
    pub fn new(config: &CollaboratorConfig, timeout: Duration) -> Result<Self, LedgerError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
        })
    }

    async fn check(
        &self,
        bank_id: &str,
        path: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, LedgerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(LedgerError::UnknownAccount(bank_id.to_string()));
        }
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to decode error response".to_string());
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        Err(LedgerError::Status {
            path: path.to_string(),
            status,
            message,
        })
    }
}

#[async_trait]
impl Ledger for IsubankClient {
    async fn new_bank_id(&self, bank_id: &str) -> Result<(), LedgerError> {
        let url = format!("{}/register", self.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.app_id)
            .json(&RegisterRequest { bank_id })
            .send()
            .await?;
        self.check(bank_id, "/register", response).await?;
        tracing::debug!(bank_id, "bank account registered");
        Ok(())
    }

    async fn add_credit(&self, bank_id: &str, amount: i64) -> Result<(), LedgerError> {
        let url = format!("{}/add_credit", self.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.app_id)
            .json(&AddCreditRequest {
                bank_id,
                price: amount,
            })
            .send()
            .await?;
        self.check(bank_id, "/add_credit", response).await?;
        tracing::debug!(bank_id, amount, "bank credit added");
        Ok(())
    }

    async fn get_credit(&self, bank_id: &str) -> Result<i64, LedgerError> {
        let url = format!("{}/credit", self.endpoint);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.app_id)
            .query(&[("bank_id", bank_id)])
            .send()
            .await?;
        let response = self.check(bank_id, "/credit", response).await?;
        let text = response.text().await?;
        serde_json::from_str::<CreditResponse>(&text)
            .map(|c| c.credit)
            .map_err(|e| LedgerError::Deserialization(format!("{}: {}", e, text)))
    }
}

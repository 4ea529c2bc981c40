//! # Audit Log
//!
//! Read access to the append-only log the exchange reports its business events
//! to. The engine never writes here; it only polls a user's history until the
//! events it expects have propagated.

use async_trait::async_trait;
use configuration::CollaboratorConfig;
use events::{AuditEvent, RawEvent};
use reqwest::Client;
use std::time::Duration;

pub mod error;

pub use error::AuditLogError;

#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Every event recorded for `user_id`, in the order the exchange emitted them.
    async fn get_user_logs(&self, user_id: i64) -> Result<Vec<AuditEvent>, AuditLogError>;
}

/// A client for the isulog query API.
pub struct IsulogClient {
    client: Client,
    endpoint: String,
    app_id: String,
}

impl IsulogClient {
    /// Every query is abandoned after `timeout`.
    pub fn new(config: &CollaboratorConfig, timeout: Duration) -> Result<Self, AuditLogError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
        })
    }
}

#[async_trait]
impl AuditLog for IsulogClient {
    async fn get_user_logs(&self, user_id: i64) -> Result<Vec<AuditEvent>, AuditLogError> {
        let url = format!("{}/logs", self.endpoint);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.app_id)
            .query(&[("user_id", user_id)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AuditLogError::Status {
                status,
                message: text,
            });
        }

        let raw: Vec<RawEvent> = serde_json::from_str(&text)
            .map_err(|e| AuditLogError::Deserialization(e.to_string()))?;
        tracing::debug!(user_id, count = raw.len(), "fetched audit log");

        raw.into_iter()
            .map(|r| AuditEvent::try_from(r).map_err(AuditLogError::from))
            .collect()
    }
}

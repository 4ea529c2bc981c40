use crate::error::ApiError;
use async_trait::async_trait;
use configuration::TesterConfig;
use core_types::{Order, SimulatedUser, TradeType};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

pub mod error;
pub mod responses;
// --- Public API ---
pub use reqwest::{Method, StatusCode};
pub use responses::{ApiErrorResponse, IdResponse, InfoResponse, InitializeParams, SigninResponse};

/// The interface the scenario engine uses to act as one user of the exchange.
///
/// One instance is bound to one `SimulatedUser` and keeps that user's session.
/// Failures carrying an HTTP status surface as `ApiError::Status`.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// The identity this client acts as.
    fn user(&self) -> &SimulatedUser;

    /// The exchange-assigned user id, known after a successful signin.
    fn user_id(&self) -> Option<i64>;

    /// Fetches the top page.
    async fn top(&self) -> Result<(), ApiError>;

    /// Fetches market info. Traded orders are only reported to a signed-in user.
    async fn info(&self, cursor: i64) -> Result<InfoResponse, ApiError>;

    async fn signup(&self) -> Result<(), ApiError>;

    /// Signs in and records the returned user id.
    async fn signin(&self) -> Result<(), ApiError>;

    async fn signout(&self) -> Result<(), ApiError>;

    /// Places a limit order. (Authenticated)
    async fn add_order(
        &self,
        trade_type: TradeType,
        amount: i64,
        price: i64,
    ) -> Result<Order, ApiError>;

    /// Lists this user's open and traded orders, oldest first. (Authenticated)
    async fn get_orders(&self) -> Result<Vec<Order>, ApiError>;

    /// Cancels an open order. (Authenticated)
    async fn delete_order(&self, order_id: i64) -> Result<(), ApiError>;
}

/// Builds one `ExchangeClient` per simulated user.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, user: &SimulatedUser) -> Result<Arc<dyn ExchangeClient>, ApiError>;
}

/// Creates `IsucoinClient`s that talk HTTP to the exchange at `base_url`.
#[derive(Debug, Clone)]
pub struct IsucoinClientFactory {
    base_url: String,
    client_timeout: Duration,
    retire_timeout: Duration,
}

impl IsucoinClientFactory {
    pub fn new(base_url: &str, tester: &TesterConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_timeout: tester.client_timeout,
            retire_timeout: tester.retire_timeout,
        }
    }

    /// Resets the exchange and hands it the bank and audit log settings.
    pub async fn initialize(&self, params: &InitializeParams) -> Result<(), ApiError> {
        let client = reqwest::Client::builder()
            .timeout(self.client_timeout)
            .build()?;
        let url = format!("{}/initialize", self.base_url);
        let response = client.post(&url).form(params).send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::info!(endpoint = %self.base_url, "exchange initialized");
            Ok(())
        } else {
            let text = response.text().await?;
            Err(ApiError::Status {
                method: Method::POST,
                path: "/initialize".to_string(),
                status,
                message: error_message(text),
            })
        }
    }
}

impl ClientFactory for IsucoinClientFactory {
    fn connect(&self, user: &SimulatedUser) -> Result<Arc<dyn ExchangeClient>, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.client_timeout)
            .build()?;
        Ok(Arc::new(IsucoinClient {
            client,
            base_url: self.base_url.clone(),
            user: user.clone(),
            retire_timeout: self.retire_timeout,
            user_id: AtomicI64::new(0),
        }))
    }
}

/// An `ExchangeClient` speaking the isucoin HTTP API.
pub struct IsucoinClient {
    client: reqwest::Client,
    base_url: String,
    user: SimulatedUser,
    retire_timeout: Duration,
    /// Zero until signin succeeds; the exchange never hands out id zero.
    user_id: AtomicI64,
}

fn error_message(text: String) -> String {
    match serde_json::from_str::<ApiErrorResponse>(&text) {
        Ok(body) => body.err,
        Err(_) => text,
    }
}

impl IsucoinClient {
    async fn call(
        &self,
        method: Method,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);
        if !form.is_empty() {
            request = request.form(form);
        }

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let elapsed = started.elapsed();
        tracing::debug!(
            bank_id = %self.user.bank_id,
            %method,
            path,
            %status,
            ?elapsed,
            "exchange call"
        );

        if !status.is_success() {
            return Err(ApiError::Status {
                method,
                path: path.to_string(),
                status,
                message: error_message(text),
            });
        }
        if elapsed > self.retire_timeout {
            return Err(ApiError::Retired {
                method,
                path: path.to_string(),
                elapsed,
            });
        }
        Ok(text)
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let text = self.call(method, path, form).await?;
        serde_json::from_str::<T>(&text).map_err(|e| {
            ApiError::Deserialization(format!("{} from {}: {}", e, path, text))
        })
    }
}

#[async_trait]
impl ExchangeClient for IsucoinClient {
    fn user(&self) -> &SimulatedUser {
        &self.user
    }

    fn user_id(&self) -> Option<i64> {
        match self.user_id.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }

    async fn top(&self) -> Result<(), ApiError> {
        self.call(Method::GET, "/", &[]).await?;
        Ok(())
    }

    async fn info(&self, cursor: i64) -> Result<InfoResponse, ApiError> {
        self.call_json(Method::GET, &format!("/info?cursor={}", cursor), &[])
            .await
    }

    async fn signup(&self) -> Result<(), ApiError> {
        let form = [
            ("name", self.user.name.clone()),
            ("bank_id", self.user.bank_id.clone()),
            ("password", self.user.password.clone()),
        ];
        self.call(Method::POST, "/signup", &form).await?;
        Ok(())
    }

    async fn signin(&self) -> Result<(), ApiError> {
        let form = [
            ("bank_id", self.user.bank_id.clone()),
            ("password", self.user.password.clone()),
        ];
        let signin: SigninResponse = self.call_json(Method::POST, "/signin", &form).await?;
        if signin.id <= 0 {
            return Err(ApiError::ApiError(format!(
                "POST /signin returned an invalid user id {}",
                signin.id
            )));
        }
        self.user_id.store(signin.id, Ordering::Release);
        Ok(())
    }

    async fn signout(&self) -> Result<(), ApiError> {
        self.call(Method::POST, "/signout", &[]).await?;
        self.user_id.store(0, Ordering::Release);
        Ok(())
    }

    async fn add_order(
        &self,
        trade_type: TradeType,
        amount: i64,
        price: i64,
    ) -> Result<Order, ApiError> {
        let form = [
            ("type", trade_type.as_str().to_string()),
            ("amount", amount.to_string()),
            ("price", price.to_string()),
        ];
        let created: IdResponse = self.call_json(Method::POST, "/orders", &form).await?;
        Ok(Order::accepted(created.id, trade_type, amount, price))
    }

    async fn get_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.call_json(Method::GET, "/orders", &[]).await
    }

    async fn delete_order(&self, order_id: i64) -> Result<(), ApiError> {
        let _: IdResponse = self
            .call_json(Method::DELETE, &format!("/order/{}", order_id), &[])
            .await?;
        Ok(())
    }
}

//! HTTP client for the order API.
//!
//! Provides [`OrderApiClient`], which logs in with the desk's service credentials,
//! caches bearer tokens per requester and retries transient failures a fixed number
//! of times before giving up.

use super::{OrderLookup, OrderRecord, OrderStatus};
use crate::config::OrderApiConfig;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ApiIntegrator {
    name: Option<String>,
}

/// Order payload as the API sends it
#[derive(Deserialize)]
struct ApiOrder {
    id: String,
    merchant_name: Option<String>,
    integrator: Option<ApiIntegrator>,
    recipient: Option<String>,
    card: Option<String>,
    #[serde(rename = "bankName")]
    bank_name: Option<String>,
    is_sbp: Option<bool>,
    sum: Option<f64>,
    currency: Option<String>,
    status: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
    #[serde(rename = "integratorOrderId")]
    integrator_order_id: Option<serde_json::Value>,
}

impl From<ApiOrder> for OrderRecord {
    fn from(order: ApiOrder) -> Self {
        let unknown = || "Unknown".to_string();
        let missing = || "N/A".to_string();

        let external_order_id = match order.integrator_order_id {
            Some(serde_json::Value::String(id)) if !id.is_empty() => Some(id),
            Some(serde_json::Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };

        Self {
            id: order.id,
            merchant_name: order.merchant_name.unwrap_or_else(unknown),
            integrator_name: order
                .integrator
                .and_then(|integrator| integrator.name)
                .unwrap_or_else(unknown),
            recipient: order.recipient.unwrap_or_else(missing),
            payment_instrument: order.card.unwrap_or_else(missing),
            bank_name: order.bank_name.unwrap_or_else(missing),
            is_instant_payment: order.is_sbp.unwrap_or(false),
            sum: order.sum.unwrap_or(0.0),
            currency: order.currency.unwrap_or_else(|| "RUB".to_string()),
            status: OrderStatus::parse(order.status.as_deref().unwrap_or("unknown")),
            created_at: order
                .created_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|at| at.with_timezone(&Utc)),
            external_order_id,
        }
    }
}

enum Attempt {
    Found(OrderRecord),
    Missing,
}

/// HTTP client for order lookups.
///
/// Tokens are cached per requester and dropped when the API answers 401/403, so the next
/// attempt logs in again.
#[derive(Debug)]
pub struct OrderApiClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    max_attempts: u32,
    retry_delay: Duration,
    tokens: RwLock<HashMap<String, String>>,
}

impl OrderApiClient {
    /// Creates a client for the API described by `config`.
    pub fn new(config: &OrderApiConfig, username: String, password: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let mut base_url = config.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            username,
            password,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_secs(1),
            tokens: RwLock::new(HashMap::new()),
        })
    }

    /// Creates a client from config plus `ORDER_API_USERNAME` / `ORDER_API_PASSWORD`.
    pub fn from_env(config: &OrderApiConfig) -> Result<Self> {
        let username = std::env::var("ORDER_API_USERNAME")?;
        let password = std::env::var("ORDER_API_PASSWORD")?;
        Self::new(config, username, password)
    }

    /// Overrides the pause between attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    async fn token(&self, requester: &str) -> Result<String> {
        if let Some(token) = self.tokens.read().await.get(requester) {
            return Ok(token.clone());
        }

        let response = self
            .client
            .post(format!("{}users/login", self.base_url))
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::OrderLookup {
                deal_id: String::new(),
                message: format!("login rejected with {status}"),
            });
        }

        let login: LoginResponse = response.json().await?;
        self.tokens
            .write()
            .await
            .insert(requester.to_string(), login.access_token.clone());
        debug!(requester, "order API token refreshed");
        Ok(login.access_token)
    }

    async fn attempt(&self, deal_id: &str, requester: &str) -> Result<Attempt> {
        let token = self.token(requester).await?;
        let response = self
            .client
            .get(format!("{}orders/{deal_id}", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let order: ApiOrder = response.json().await?;
                Ok(Attempt::Found(order.into()))
            }
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(Attempt::Missing),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                self.tokens.write().await.remove(requester);
                Err(Error::OrderLookup {
                    deal_id: deal_id.to_string(),
                    message: format!("token refused with {status}"),
                })
            }
            status => Err(Error::OrderLookup {
                deal_id: deal_id.to_string(),
                message: format!("API returned {status}"),
            }),
        }
    }
}

#[async_trait]
impl OrderLookup for OrderApiClient {
    async fn get_order(&self, deal_id: &str, requester: &str) -> Result<Option<OrderRecord>> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.attempt(deal_id, requester).await {
                Ok(Attempt::Found(order)) => {
                    debug!(deal_id, status = %order.status, "order fetched");
                    return Ok(Some(order));
                }
                Ok(Attempt::Missing) => {
                    debug!(deal_id, "order API does not know this deal");
                    return Ok(None);
                }
                Err(e) => {
                    warn!(deal_id, attempt, error = %e, "order lookup attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(Error::OrderLookup {
            deal_id: deal_id.to_string(),
            message: last_error.map_or_else(|| "no attempts made".to_string(), |e| e.to_string()),
        })
    }
}

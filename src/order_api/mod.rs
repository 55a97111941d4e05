//! Order lookup - the external system of record for a deal's authoritative status.
//!
//! The desk only ever asks one question of it: "what do you know about this deal id?".
//! [`OrderLookup`] is that question; [`client::OrderApiClient`] answers it over HTTP.

/// HTTP implementation of [`OrderLookup`]
pub mod client;

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use client::OrderApiClient;

/// Status of an order as reported by the order API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Payment still in flight
    Processing,
    /// External confirmation received
    Success,
    /// Cancelled on the order system side
    Canceled,
    /// Any status the desk does not act on
    Other(String),
}

impl OrderStatus {
    /// Maps the API's status string; unknown values are kept verbatim
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "processing" => Self::Processing,
            "success" => Self::Success,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Whether the external system has confirmed the payment
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => f.write_str("processing"),
            Self::Success => f.write_str("success"),
            Self::Canceled => f.write_str("canceled"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Canonical attributes of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Order identifier, equal to the deal id
    pub id: String,
    /// Merchant name as known to the order system
    pub merchant_name: String,
    /// Integrator the order was routed to
    pub integrator_name: String,
    /// Payment recipient
    pub recipient: String,
    /// Card number or phone the payment was made to
    pub payment_instrument: String,
    /// Recipient bank
    pub bank_name: String,
    /// Paid through the instant payment system rather than by card
    pub is_instant_payment: bool,
    /// Order amount
    pub sum: f64,
    /// Currency code
    pub currency: String,
    /// Current status
    pub status: OrderStatus,
    /// Creation time, None if the API sent something unparseable
    pub created_at: Option<DateTime<Utc>>,
    /// The integrator's own reference for the order
    pub external_order_id: Option<String>,
}

/// Resolves a deal id to its order record.
///
/// `Ok(None)` means the order system does not know the id. `Err` means the question
/// could not be answered after the implementation's own retries.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    /// Looks up `deal_id` on behalf of `requester`.
    async fn get_order(&self, deal_id: &str, requester: &str) -> Result<Option<OrderRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_parse() {
        assert_eq!(OrderStatus::parse("success"), OrderStatus::Success);
        assert_eq!(OrderStatus::parse("SUCCESS"), OrderStatus::Success);
        assert_eq!(OrderStatus::parse("processing"), OrderStatus::Processing);
        assert_eq!(OrderStatus::parse("cancelled"), OrderStatus::Canceled);
        assert_eq!(
            OrderStatus::parse("dispute"),
            OrderStatus::Other("dispute".to_string())
        );
        assert!(OrderStatus::Success.is_success());
        assert!(!OrderStatus::Processing.is_success());
    }
}

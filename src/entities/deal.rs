//! Deal entity - a payment dispute tracked from merchant submission to a terminal outcome.
//!
//! `deal_id` is the external order reference. Several rows may share a `deal_id` over
//! time (a rejected deal can be resubmitted), but at most one of them is live.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a deal
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    /// Submitted by the merchant, waiting on a human handler
    #[sea_orm(string_value = "awaiting")]
    Awaiting,
    /// Approved by the handler, waiting on the integrator's confirmation
    #[sea_orm(string_value = "awaiting_integrator")]
    AwaitingIntegrator,
    /// Confirmed by the external system
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Rejected with a reason
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Approved, but no integrator chat could be resolved
    #[sea_orm(string_value = "pending_manual")]
    PendingManual,
}

impl DealStatus {
    /// Stable lowercase name, identical to the stored value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Awaiting => "awaiting",
            Self::AwaitingIntegrator => "awaiting_integrator",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::PendingManual => "pending_manual",
        }
    }

    /// Statuses that block a resubmission of the same deal id.
    ///
    /// `pending_manual` counts as live: somebody is handling it out of band.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(
            self,
            Self::Awaiting | Self::AwaitingIntegrator | Self::PendingManual
        )
    }

    /// Statuses the reconciliation sweep looks at
    #[must_use]
    pub const fn is_swept(self) -> bool {
        matches!(self, Self::Awaiting | Self::AwaitingIntegrator)
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deals")]
pub struct Model {
    /// Row identifier, also the insertion order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// External order reference (UUID-shaped, lowercase)
    #[sea_orm(indexed)]
    pub deal_id: String,
    /// Chat the merchant posted the deal in
    pub merchant_chat_id: String,
    /// Merchant's originating message
    pub message_id: String,
    /// Current lifecycle status
    pub status: DealStatus,
    /// When the deal last entered an awaiting status
    pub sent_time: DateTimeUtc,
    /// Owning merchant, None for private-chat submissions
    pub merchant_id: Option<String>,
    /// Human currently responsible for the deal
    pub handler_id: String,
}

/// `Deal` is linked to its message copies by `deal_id`, not by a foreign key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! SLA notification entity - a record of every breach notice sent.
//!
//! The sweep consults these rows to suppress repeated notices for the same waiting period.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SLA notification database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sla_notifications")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Deal that breached its SLA
    #[sea_orm(indexed)]
    pub deal_id: String,
    /// Notice delivered to the handler, None if delivery failed
    pub message_id: Option<String>,
    /// Whether the notice reached the handler
    pub sent: bool,
    /// When the breach was recorded
    pub notified_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

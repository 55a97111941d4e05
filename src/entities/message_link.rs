//! Message link entity - one row per copy of a deal relayed into a chat.
//!
//! Links are append-only. They let a button press or a reply be traced back to its deal.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Message link database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message_links")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// External order reference
    #[sea_orm(indexed)]
    pub deal_id: String,
    /// Chat holding the message
    pub chat_id: String,
    /// The message itself
    pub message_id: String,
    /// User whose action produced the message
    pub user_id: String,
    /// When the message was sent
    pub sent_time: DateTimeUtc,
}

/// `MessageLink` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Merchant entity - the party originating deals, bound to one chat and at most one handler.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Merchant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "merchants")]
pub struct Model {
    /// Row identifier, also the insertion order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique key used in admin commands
    #[sea_orm(unique)]
    pub name: String,
    /// Name shown in notifications
    pub display_name: String,
    /// Bound chat, None while unbound
    pub chat_id: Option<String>,
    /// Generated identity referenced by deals
    #[sea_orm(unique)]
    pub merchant_id: String,
    /// Staff member currently claiming this merchant's deals
    pub handler_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Stat entity - additive per-user daily counters.
//!
//! One row per `(user_id, date, kind)`. The set of merchants touched on a day lives in
//! [`super::stat_merchant`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Counter kinds tracked per user and day
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Deals delivered to the user
    #[sea_orm(string_value = "taken")]
    Taken,
    /// Deals the user escalated to an integrator
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Deals that reached `completed`
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Deals that reached `rejected`
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Deals taken into manual processing with the view button
    #[sea_orm(string_value = "viewed")]
    Viewed,
    /// Faults reported while handling the user's deals
    #[sea_orm(string_value = "errors")]
    Errors,
    /// Messages received in the user's merchant chats
    #[sea_orm(string_value = "merchant_messages")]
    MerchantMessages,
}

/// Stat counter database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stats")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User the counter belongs to
    pub user_id: String,
    /// Local calendar date of the desk
    pub date: Date,
    /// Which counter
    pub kind: StatKind,
    /// Accumulated value
    pub count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

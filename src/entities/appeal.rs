//! Appeal entity - a staff member waiting for extra proofs on a deal.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Appeal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "appeals")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Deal under appeal, one appeal per deal
    #[sea_orm(unique)]
    pub deal_id: String,
    /// Staff member who receives the proofs
    pub user_id: String,
    /// Opened by hand with the appeal command rather than by the bot
    pub is_manual: bool,
    /// When the appeal was opened
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

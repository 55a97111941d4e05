//! Shift entity - a staff member's working session.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shift database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shifts")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Staff member working the shift
    #[sea_orm(indexed)]
    pub user_id: String,
    /// When the shift started
    pub start_time: DateTimeUtc,
    /// When the shift was stopped, None while open
    pub end_time: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

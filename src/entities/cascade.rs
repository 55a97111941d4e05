//! Cascade entity - an integrator that must confirm a deal's external success.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cascade (integrator) database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cascades")]
pub struct Model {
    /// Row identifier. Ascending id is the matcher's tie-break order.
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique key, compared against the order API's integrator name
    #[sea_orm(unique)]
    pub name: String,
    /// Name shown in listings
    pub display_name: String,
    /// Bound integrator chat, None while unbound
    pub chat_id: Option<String>,
    /// Whether deal summaries sent to this integrator must carry the external order id
    pub needs_external_id: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

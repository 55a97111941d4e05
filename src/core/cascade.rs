//! Cascade (integrator) store operations.
//!
//! Cascades are upserted by name: fields that are not supplied keep their stored value.

use crate::{
    entities::{Cascade, cascade},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Fields to merge into a cascade; `None` leaves the stored value alone
#[derive(Debug, Clone, Default)]
pub struct CascadeUpdate {
    /// Unique name, the match key for integrator routing
    pub name: String,
    /// Name shown in messages
    pub display_name: Option<String>,
    /// Integrator chat
    pub chat_id: Option<String>,
    /// Whether the integrator needs its own order id on every deal
    pub needs_external_id: Option<bool>,
}

impl CascadeUpdate {
    /// Update that only names the cascade
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            ..Self::default()
        }
    }
}

/// All cascades in registration order, the order fuzzy matching walks.
pub async fn get_all_cascades(db: &DatabaseConnection) -> Result<Vec<cascade::Model>> {
    Cascade::find()
        .order_by_asc(cascade::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds the cascade bound to a chat.
pub async fn get_cascade_by_chat(
    db: &DatabaseConnection,
    chat_id: &str,
) -> Result<Option<cascade::Model>> {
    Cascade::find()
        .filter(cascade::Column::ChatId.eq(chat_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates the cascade or merges the supplied fields into it.
pub async fn merge_cascade(db: &DatabaseConnection, update: CascadeUpdate) -> Result<cascade::Model> {
    if update.name.is_empty() {
        return Err(Error::Config {
            message: "Cascade name cannot be empty".to_string(),
        });
    }

    let existing = Cascade::find()
        .filter(cascade::Column::Name.eq(&update.name))
        .one(db)
        .await?;

    let model = match existing {
        Some(existing) => {
            let mut active: cascade::ActiveModel = existing.into();
            if let Some(display_name) = update.display_name {
                active.display_name = Set(display_name);
            }
            if let Some(chat_id) = update.chat_id {
                active.chat_id = Set(Some(chat_id));
            }
            if let Some(needs_external_id) = update.needs_external_id {
                active.needs_external_id = Set(needs_external_id);
            }
            active.update(db).await?
        }
        None => {
            let active = cascade::ActiveModel {
                display_name: Set(update.display_name.unwrap_or_else(|| update.name.clone())),
                name: Set(update.name),
                chat_id: Set(update.chat_id),
                needs_external_id: Set(update.needs_external_id.unwrap_or(false)),
                ..Default::default()
            };
            active.insert(db).await?
        }
    };

    info!(name = %model.name, chat_id = ?model.chat_id, "cascade merged");
    Ok(model)
}

/// Removes a cascade.
pub async fn delete_cascade(db: &DatabaseConnection, name: &str) -> Result<()> {
    let result = Cascade::delete_many()
        .filter(cascade::Column::Name.eq(name))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "Cascade",
            name: name.to_string(),
        });
    }
    info!(name, "cascade deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_merge_keeps_unsupplied_fields() -> Result<()> {
        let db = setup_test_db().await?;
        merge_cascade(
            &db,
            CascadeUpdate {
                chat_id: Some("int-chat".to_string()),
                ..CascadeUpdate::named("Acme")
            },
        )
        .await?;

        let merged = merge_cascade(
            &db,
            CascadeUpdate {
                needs_external_id: Some(true),
                ..CascadeUpdate::named("Acme")
            },
        )
        .await?;

        assert_eq!(merged.chat_id.as_deref(), Some("int-chat"));
        assert_eq!(merged.display_name, "Acme");
        assert!(merged.needs_external_id);
        assert_eq!(get_all_cascades(&db).await?.len(), 1);

        let by_chat = get_cascade_by_chat(&db, "int-chat").await?.unwrap();
        assert_eq!(by_chat.id, merged.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_cascades_listed_in_registration_order() -> Result<()> {
        let db = setup_test_db().await?;
        merge_cascade(&db, CascadeUpdate::named("zeta")).await?;
        merge_cascade(&db, CascadeUpdate::named("alpha")).await?;

        let names: Vec<_> = get_all_cascades(&db)
            .await?
            .into_iter()
            .map(|cascade| cascade.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);

        delete_cascade(&db, "zeta").await?;
        assert!(matches!(
            delete_cascade(&db, "zeta").await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}

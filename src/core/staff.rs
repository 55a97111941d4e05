//! Staff roster and permission guards.
//!
//! Admins come from config. Staff are the configured `staff_ids` plus whoever an admin
//! added with `add_user`. Every admin is also staff.

use crate::{
    config::DeskConfig,
    entities::{Staff, staff},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

const ENTITY: &str = "Staff member";

/// Adds a user to the staff roster.
pub async fn add_staff(
    db: &DatabaseConnection,
    user_id: &str,
    added_by: &str,
    now: DateTime<Utc>,
) -> Result<staff::Model> {
    let exists = Staff::find()
        .filter(staff::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Err(Error::AlreadyExists {
            entity: ENTITY,
            name: user_id.to_string(),
        });
    }

    let member = staff::ActiveModel {
        user_id: Set(user_id.to_string()),
        added_by: Set(added_by.to_string()),
        added_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(user_id, added_by, "staff member added");
    Ok(member)
}

/// Removes a user from the staff roster.
pub async fn remove_staff(db: &DatabaseConnection, user_id: &str) -> Result<()> {
    let result = Staff::delete_many()
        .filter(staff::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: ENTITY,
            name: user_id.to_string(),
        });
    }
    info!(user_id, "staff member removed");
    Ok(())
}

/// Roster entries in the order they were added.
pub async fn list_staff(db: &DatabaseConnection) -> Result<Vec<staff::Model>> {
    Staff::find()
        .order_by_asc(staff::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Whether the user may act as a handler.
pub async fn is_staff(db: &DatabaseConnection, config: &DeskConfig, user_id: &str) -> Result<bool> {
    if config.is_admin(user_id) || config.staff_ids.iter().any(|id| id == user_id) {
        return Ok(true);
    }
    Ok(Staff::find()
        .filter(staff::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .is_some())
}

/// Fails with `Unauthorized` unless the user is staff.
pub async fn require_staff(
    db: &DatabaseConnection,
    config: &DeskConfig,
    user_id: &str,
    action: &str,
) -> Result<()> {
    if is_staff(db, config, user_id).await? {
        Ok(())
    } else {
        Err(Error::Unauthorized {
            user_id: user_id.to_string(),
            action: action.to_string(),
        })
    }
}

/// Fails with `Unauthorized` unless the user is an admin.
pub fn require_admin(config: &DeskConfig, user_id: &str, action: &str) -> Result<()> {
    if config.is_admin(user_id) {
        Ok(())
    } else {
        Err(Error::Unauthorized {
            user_id: user_id.to_string(),
            action: action.to_string(),
        })
    }
}

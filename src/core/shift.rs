//! Shift tracking. A user has at most one open shift.

use crate::{
    entities::{Shift, shift},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};

/// The user's shift that has not been stopped, if any.
pub async fn get_open_shift(db: &DatabaseConnection, user_id: &str) -> Result<Option<shift::Model>> {
    Shift::find()
        .filter(shift::Column::UserId.eq(user_id))
        .filter(shift::Column::EndTime.is_null())
        .order_by_desc(shift::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Opens a shift starting at `now`.
///
/// # Errors
/// `ShiftAlreadyOpen` if the user has not stopped their previous shift.
pub async fn start_shift(
    db: &DatabaseConnection,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<shift::Model> {
    if get_open_shift(db, user_id).await?.is_some() {
        return Err(Error::ShiftAlreadyOpen {
            user_id: user_id.to_string(),
        });
    }

    shift::ActiveModel {
        user_id: Set(user_id.to_string()),
        start_time: Set(now),
        end_time: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Closes the user's open shift at `now`; `None` if there was none.
pub async fn stop_shift(
    db: &DatabaseConnection,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<shift::Model>> {
    let Some(open) = get_open_shift(db, user_id).await? else {
        return Ok(None);
    };

    let mut active: shift::ActiveModel = open.into();
    active.end_time = Set(Some(now));
    Ok(Some(active.update(db).await?))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_one_open_shift_per_user() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();

        start_shift(&db, "alice", now).await?;
        assert!(matches!(
            start_shift(&db, "alice", now).await,
            Err(Error::ShiftAlreadyOpen { .. })
        ));
        start_shift(&db, "bob", now).await?;

        let closed = stop_shift(&db, "alice", now).await?.unwrap();
        assert_eq!(closed.end_time, Some(now));
        assert!(get_open_shift(&db, "alice").await?.is_none());
        assert!(stop_shift(&db, "alice", now).await?.is_none());

        start_shift(&db, "alice", now).await?;
        Ok(())
    }
}

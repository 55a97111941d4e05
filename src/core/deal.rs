//! Deal store operations.
//!
//! Rows are never reused across submissions: a resubmitted deal id gets a new row, and
//! the newest row is the deal's current state. All writes accept any `ConnectionTrait`
//! so they can join a caller's transaction.

use crate::{
    entities::{Deal, DealStatus, deal},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Fields of a deal being created
#[derive(Debug, Clone)]
pub struct NewDeal {
    /// External order reference
    pub deal_id: String,
    /// Chat the merchant posted in
    pub merchant_chat_id: String,
    /// Merchant's originating message
    pub message_id: String,
    /// When the merchant posted
    pub sent_time: DateTime<Utc>,
    /// Owning merchant, None for private chats
    pub merchant_id: Option<String>,
    /// Human responsible for the deal
    pub handler_id: String,
}

/// Inserts a deal in `awaiting`.
pub async fn create_deal<C>(db: &C, new: NewDeal) -> Result<deal::Model>
where
    C: ConnectionTrait,
{
    let deal = deal::ActiveModel {
        deal_id: Set(new.deal_id),
        merchant_chat_id: Set(new.merchant_chat_id),
        message_id: Set(new.message_id),
        status: Set(DealStatus::Awaiting),
        sent_time: Set(new.sent_time),
        merchant_id: Set(new.merchant_id),
        handler_id: Set(new.handler_id),
        ..Default::default()
    };

    deal.insert(db).await.map_err(Into::into)
}

/// Newest row for `deal_id`, whatever its status.
pub async fn get_latest_deal<C>(db: &C, deal_id: &str) -> Result<Option<deal::Model>>
where
    C: ConnectionTrait,
{
    Deal::find()
        .filter(deal::Column::DealId.eq(deal_id))
        .order_by_desc(deal::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// The live row for `deal_id`, if there is one.
pub async fn get_live_deal<C>(db: &C, deal_id: &str) -> Result<Option<deal::Model>>
where
    C: ConnectionTrait,
{
    Ok(get_latest_deal(db, deal_id)
        .await?
        .filter(|deal| deal.status.is_live()))
}

/// Re-reads a row by primary key.
pub async fn get_deal_by_id<C>(db: &C, id: i64) -> Result<Option<deal::Model>>
where
    C: ConnectionTrait,
{
    Deal::find_by_id(id).one(db).await.map_err(Into::into)
}

/// All rows in any of `statuses`, oldest first.
pub async fn get_deals_by_status<C>(db: &C, statuses: &[DealStatus]) -> Result<Vec<deal::Model>>
where
    C: ConnectionTrait,
{
    Deal::find()
        .filter(deal::Column::Status.is_in(statuses.iter().copied()))
        .order_by_asc(deal::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Moves a deal to `status`.
///
/// Entering `awaiting_integrator` restarts the SLA clock at `now`.
///
/// # Arguments
/// * `db` - Database connection or transaction
/// * `deal` - The row as last read
/// * `status` - Target status
/// * `now` - Time of the transition
pub async fn update_status<C>(
    db: &C,
    deal: deal::Model,
    status: DealStatus,
    now: DateTime<Utc>,
) -> Result<deal::Model>
where
    C: ConnectionTrait,
{
    let id = deal.id;
    // The row may have been purged between read and write.
    if Deal::find_by_id(id).one(db).await?.is_none() {
        return Err(Error::DealNotFound {
            deal_id: deal.deal_id,
        });
    }

    let mut active: deal::ActiveModel = deal.into();
    active.status = Set(status);
    if status == DealStatus::AwaitingIntegrator {
        active.sent_time = Set(now);
    }
    active.update(db).await.map_err(Into::into)
}

/// Every row whose status is not `keep`, oldest first.
pub async fn get_deals_except<C>(db: &C, keep: DealStatus) -> Result<Vec<deal::Model>>
where
    C: ConnectionTrait,
{
    Deal::find()
        .filter(deal::Column::Status.ne(keep))
        .order_by_asc(deal::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes one row, returning whether it still existed.
pub async fn delete_deal<C>(db: &C, id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Deal::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{create_test_deal, setup_test_db};
    use chrono::TimeDelta;

    const DEAL: &str = "a1b2c3d4-e5f6-7890-abcd-1234567890ab";

    #[tokio::test]
    async fn test_live_deal_ignores_terminal_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_deal(&db, DEAL, "merchant-chat", "handler").await?;
        update_status(&db, first, DealStatus::Rejected, Utc::now()).await?;

        assert!(get_live_deal(&db, DEAL).await?.is_none());

        let second = create_test_deal(&db, DEAL, "merchant-chat", "handler").await?;
        let live = get_live_deal(&db, DEAL).await?.unwrap();
        assert_eq!(live.id, second.id);
        assert_eq!(live.status, DealStatus::Awaiting);
        Ok(())
    }

    #[tokio::test]
    async fn test_entering_awaiting_integrator_restarts_clock() -> Result<()> {
        let db = setup_test_db().await?;
        let deal = create_test_deal(&db, DEAL, "merchant-chat", "handler").await?;
        let later = deal.sent_time + TimeDelta::minutes(10);

        let updated = update_status(&db, deal.clone(), DealStatus::AwaitingIntegrator, later).await?;
        assert_eq!(updated.sent_time, later);

        let completed = update_status(&db, updated, DealStatus::Completed, later + TimeDelta::minutes(5)).await?;
        assert_eq!(completed.sent_time, later);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_status_of_purged_deal_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let deal = create_test_deal(&db, DEAL, "merchant-chat", "handler").await?;
        assert!(delete_deal(&db, deal.id).await?);
        assert!(!delete_deal(&db, deal.id).await?);

        let result = update_status(&db, deal, DealStatus::Rejected, Utc::now()).await;
        assert!(matches!(result, Err(Error::DealNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_deals_except_skips_kept_status() -> Result<()> {
        let db = setup_test_db().await?;
        let kept = create_test_deal(&db, DEAL, "c", "h").await?;
        update_status(&db, kept, DealStatus::AwaitingIntegrator, Utc::now()).await?;
        create_test_deal(&db, "00000000-1111-2222-3333-444444444444", "c", "h").await?;

        let doomed = get_deals_except(&db, DealStatus::AwaitingIntegrator).await?;
        assert_eq!(doomed.len(), 1);
        assert_eq!(doomed[0].deal_id, "00000000-1111-2222-3333-444444444444");
        Ok(())
    }
}

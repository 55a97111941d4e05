//! SLA breach notification log.
//!
//! Each breach notice sent is recorded. Under the `once` policy a notice newer than the
//! deal's `sent_time` means the current waiting period was already reported.

use crate::{
    entities::{SlaNotification, sla_notification},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*};

/// Records a breach notice for a deal.
pub async fn record_notification<C>(
    db: &C,
    deal_id: &str,
    message_id: Option<String>,
    sent: bool,
    now: DateTime<Utc>,
) -> Result<sla_notification::Model>
where
    C: ConnectionTrait,
{
    sla_notification::ActiveModel {
        deal_id: Set(deal_id.to_string()),
        message_id: Set(message_id),
        sent: Set(sent),
        notified_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Whether a notice was sent for `deal_id` at or after `since`.
pub async fn notified_since<C>(db: &C, deal_id: &str, since: DateTime<Utc>) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = SlaNotification::find()
        .filter(sla_notification::Column::DealId.eq(deal_id))
        .filter(sla_notification::Column::Sent.eq(true))
        .filter(sla_notification::Column::NotifiedAt.gte(since))
        .count(db)
        .await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn test_notified_since_only_counts_newer_notices() -> Result<()> {
        let db = setup_test_db().await?;
        let sent_time = Utc::now();

        record_notification(&db, "deal-1", None, true, sent_time - TimeDelta::hours(2)).await?;
        assert!(!notified_since(&db, "deal-1", sent_time).await?);

        record_notification(&db, "deal-1", Some("m1".to_string()), true, sent_time + TimeDelta::minutes(41)).await?;
        assert!(notified_since(&db, "deal-1", sent_time).await?);
        assert!(!notified_since(&db, "deal-2", sent_time).await?);
        Ok(())
    }
}

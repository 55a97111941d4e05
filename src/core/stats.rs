//! Daily per-user statistics.
//!
//! Counters are additive: `add_stat` increments in place with a single `UPDATE`, so a
//! sweep and a button press crediting the same handler never lose an increment.

use crate::{
    entities::{Stat, StatKind, StatMerchant, stat, stat_merchant},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};

/// One user's counters for one day
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyStats {
    /// Deals delivered to the user
    pub taken: i64,
    /// Deals escalated to an integrator
    pub approved: i64,
    /// Deals completed
    pub completed: i64,
    /// Deals rejected
    pub rejected: i64,
    /// Deals taken into manual processing
    pub viewed: i64,
    /// Faults reported
    pub errors: i64,
    /// Messages received in the user's merchant chats
    pub merchant_messages: i64,
    /// Merchants touched, in first-touch order
    pub merchants: Vec<String>,
}

impl DailyStats {
    /// Deals that reached a final decision
    #[must_use]
    pub const fn iterations(&self) -> i64 {
        self.completed + self.rejected
    }

    const fn counter_mut(&mut self, kind: StatKind) -> &mut i64 {
        match kind {
            StatKind::Taken => &mut self.taken,
            StatKind::Approved => &mut self.approved,
            StatKind::Completed => &mut self.completed,
            StatKind::Rejected => &mut self.rejected,
            StatKind::Viewed => &mut self.viewed,
            StatKind::Errors => &mut self.errors,
            StatKind::MerchantMessages => &mut self.merchant_messages,
        }
    }
}

/// Adds `count` to a user's counter for `date` and records the merchant as touched.
///
/// # Arguments
/// * `db` - Database connection or an enclosing transaction
/// * `user_id` - User credited
/// * `kind` - Counter to increment
/// * `merchant_name` - Merchant involved, if any
/// * `count` - Increment
/// * `date` - Desk-local date
pub async fn add_stat<C>(
    db: &C,
    user_id: &str,
    kind: StatKind,
    merchant_name: Option<&str>,
    count: i64,
    date: NaiveDate,
) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let updated = Stat::update_many()
        .col_expr(stat::Column::Count, Expr::col(stat::Column::Count).add(count))
        .filter(stat::Column::UserId.eq(user_id))
        .filter(stat::Column::Date.eq(date))
        .filter(stat::Column::Kind.eq(kind))
        .exec(&txn)
        .await?;

    if updated.rows_affected == 0 {
        stat::ActiveModel {
            user_id: Set(user_id.to_string()),
            date: Set(date),
            kind: Set(kind),
            count: Set(count),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    if let Some(merchant_name) = merchant_name {
        let seen = StatMerchant::find()
            .filter(stat_merchant::Column::UserId.eq(user_id))
            .filter(stat_merchant::Column::Date.eq(date))
            .filter(stat_merchant::Column::MerchantName.eq(merchant_name))
            .one(&txn)
            .await?;
        if seen.is_none() {
            stat_merchant::ActiveModel {
                user_id: Set(user_id.to_string()),
                date: Set(date),
                merchant_name: Set(merchant_name.to_string()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    txn.commit().await?;
    Ok(())
}

/// Folds a user's counters for `date` into a [`DailyStats`].
pub async fn get_stats(db: &DatabaseConnection, user_id: &str, date: NaiveDate) -> Result<DailyStats> {
    let counters = Stat::find()
        .filter(stat::Column::UserId.eq(user_id))
        .filter(stat::Column::Date.eq(date))
        .all(db)
        .await?;

    let merchants = StatMerchant::find()
        .filter(stat_merchant::Column::UserId.eq(user_id))
        .filter(stat_merchant::Column::Date.eq(date))
        .order_by_asc(stat_merchant::Column::Id)
        .all(db)
        .await?;

    let mut stats = DailyStats {
        merchants: merchants.into_iter().map(|m| m.merchant_name).collect(),
        ..DailyStats::default()
    };
    for counter in counters {
        *stats.counter_mut(counter.kind) += counter.count;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn test_add_stat_is_additive() -> Result<()> {
        let db = setup_test_db().await?;
        add_stat(&db, "alice", StatKind::Taken, Some("shop"), 1, day(18)).await?;
        add_stat(&db, "alice", StatKind::Taken, Some("shop"), 2, day(18)).await?;
        add_stat(&db, "alice", StatKind::Approved, Some("mall"), 1, day(18)).await?;
        add_stat(&db, "alice", StatKind::Viewed, None, 1, day(18)).await?;

        let stats = get_stats(&db, "alice", day(18)).await?;
        assert_eq!(stats.taken, 3);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.viewed, 1);
        assert_eq!(stats.merchants, vec!["shop", "mall"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_are_per_user_and_day() -> Result<()> {
        let db = setup_test_db().await?;
        add_stat(&db, "alice", StatKind::Completed, None, 1, day(18)).await?;
        add_stat(&db, "alice", StatKind::Rejected, None, 1, day(18)).await?;
        add_stat(&db, "alice", StatKind::Completed, None, 5, day(17)).await?;
        add_stat(&db, "bob", StatKind::Completed, None, 7, day(18)).await?;

        let stats = get_stats(&db, "alice", day(18)).await?;
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.iterations(), 2);

        assert_eq!(get_stats(&db, "carol", day(18)).await?, DailyStats::default());
        Ok(())
    }
}

//! Appeals and the proof messages collected for them.

use crate::{
    entities::{Appeal, ProofMessage, appeal, proof_message},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Opens an appeal on a deal, owned by `user_id`.
///
/// # Errors
/// `AlreadyExists` if the deal already has an appeal.
pub async fn create_appeal(
    db: &DatabaseConnection,
    deal_id: &str,
    user_id: &str,
    is_manual: bool,
    now: DateTime<Utc>,
) -> Result<appeal::Model> {
    if get_appeal(db, deal_id).await?.is_some() {
        return Err(Error::AlreadyExists {
            entity: "Appeal",
            name: deal_id.to_string(),
        });
    }

    appeal::ActiveModel {
        deal_id: Set(deal_id.to_string()),
        user_id: Set(user_id.to_string()),
        is_manual: Set(is_manual),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// The appeal on a deal, if any.
pub async fn get_appeal<C>(db: &C, deal_id: &str) -> Result<Option<appeal::Model>>
where
    C: ConnectionTrait,
{
    Appeal::find()
        .filter(appeal::Column::DealId.eq(deal_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Records a forwarded proof.
pub async fn add_proof_message<C>(
    db: &C,
    deal_id: &str,
    message_id: &str,
    now: DateTime<Utc>,
) -> Result<proof_message::Model>
where
    C: ConnectionTrait,
{
    proof_message::ActiveModel {
        deal_id: Set(deal_id.to_string()),
        message_id: Set(message_id.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Proofs forwarded for a deal, oldest first.
pub async fn get_proof_messages(
    db: &DatabaseConnection,
    deal_id: &str,
) -> Result<Vec<proof_message::Model>> {
    ProofMessage::find()
        .filter(proof_message::Column::DealId.eq(deal_id))
        .order_by_asc(proof_message::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_one_appeal_per_deal() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        create_appeal(&db, "deal-1", "alice", true, now).await?;
        assert!(matches!(
            create_appeal(&db, "deal-1", "bob", false, now).await,
            Err(Error::AlreadyExists { .. })
        ));
        assert_eq!(get_appeal(&db, "deal-1").await?.unwrap().user_id, "alice");
        Ok(())
    }

    #[tokio::test]
    async fn test_proof_messages_in_order() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        add_proof_message(&db, "deal-1", "m1", now).await?;
        add_proof_message(&db, "deal-1", "m2", now).await?;
        add_proof_message(&db, "deal-2", "m3", now).await?;

        let ids: Vec<_> = get_proof_messages(&db, "deal-1")
            .await?
            .into_iter()
            .map(|proof| proof.message_id)
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        Ok(())
    }
}

//! Message link store operations.
//!
//! Every copy of a deal the bot relays gets a link, so a later button press or reply on
//! any copy can be traced back to its deal.

use crate::{
    entities::{MessageLink, message_link},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Records a relayed copy of a deal.
///
/// # Arguments
/// * `deal_id` - Deal the copy belongs to
/// * `chat_id` - Channel the copy was posted in
/// * `message_id` - The copy
/// * `user_id` - Who caused the copy (handler, integrator user, merchant)
/// * `sent_time` - When it was posted
pub async fn add_message<C>(
    db: &C,
    deal_id: &str,
    chat_id: &str,
    message_id: &str,
    user_id: &str,
    sent_time: DateTime<Utc>,
) -> Result<message_link::Model>
where
    C: ConnectionTrait,
{
    let link = message_link::ActiveModel {
        deal_id: Set(deal_id.to_string()),
        chat_id: Set(chat_id.to_string()),
        message_id: Set(message_id.to_string()),
        user_id: Set(user_id.to_string()),
        sent_time: Set(sent_time),
        ..Default::default()
    };
    link.insert(db).await.map_err(Into::into)
}

/// Conjunctive filter over message links; unset fields match anything
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFilter<'a> {
    /// Only links of this deal
    pub deal_id: Option<&'a str>,
    /// Only links in this channel
    pub chat_id: Option<&'a str>,
    /// Only links for this message
    pub message_id: Option<&'a str>,
}

/// Links matching every supplied field, in the order they were recorded.
pub async fn get_messages<C>(db: &C, filter: MessageFilter<'_>) -> Result<Vec<message_link::Model>>
where
    C: ConnectionTrait,
{
    let mut query = MessageLink::find();
    if let Some(deal_id) = filter.deal_id {
        query = query.filter(message_link::Column::DealId.eq(deal_id));
    }
    if let Some(chat_id) = filter.chat_id {
        query = query.filter(message_link::Column::ChatId.eq(chat_id));
    }
    if let Some(message_id) = filter.message_id {
        query = query.filter(message_link::Column::MessageId.eq(message_id));
    }

    query
        .order_by_asc(message_link::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_get_messages_filters_conjunctively() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        add_message(&db, "deal-1", "chat-a", "10", "u1", now).await?;
        add_message(&db, "deal-1", "chat-b", "11", "u1", now).await?;
        add_message(&db, "deal-2", "chat-a", "12", "u2", now).await?;

        let all_deal_1 = get_messages(
            &db,
            MessageFilter {
                deal_id: Some("deal-1"),
                ..MessageFilter::default()
            },
        )
        .await?;
        assert_eq!(all_deal_1.len(), 2);

        let one = get_messages(
            &db,
            MessageFilter {
                deal_id: Some("deal-1"),
                chat_id: Some("chat-a"),
                message_id: None,
            },
        )
        .await?;
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].message_id, "10");

        let none = get_messages(
            &db,
            MessageFilter {
                deal_id: Some("deal-2"),
                chat_id: Some("chat-b"),
                message_id: None,
            },
        )
        .await?;
        assert!(none.is_empty());

        assert_eq!(get_messages(&db, MessageFilter::default()).await?.len(), 3);
        Ok(())
    }
}

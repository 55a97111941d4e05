//! Inbound message handling.
//!
//! A message is routed by where it was posted: merchant chats and DMs submit deals or
//! request callbacks, integrator chats send proofs for rejected deals, DMs about a deal
//! under appeal carry appeal proofs. Staff talking in shared chats is ignored.

use crate::core::desk::DealDesk;
use crate::core::transport::{ChatTarget, IncomingMessage, OutgoingMessage};
use crate::core::{appeal, cascade, deal, deal_id, lifecycle, merchant, message_link, staff, stats, templates};
use crate::entities::{DealStatus, StatKind, appeal as appeal_entity, cascade as cascade_entity};
use crate::entities::{deal as deal_entity, merchant as merchant_entity};
use crate::errors::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::TransactionTrait;
use tracing::{debug, info, warn};

impl DealDesk {
    /// Processes a new message.
    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<()> {
        if !message.is_private
            && staff::is_staff(self.db(), self.config(), &message.author_id).await?
        {
            debug!(chat_id = %message.chat_id, "ignoring staff message");
            return Ok(());
        }

        let merchant = merchant::get_merchant_by_chat(self.db(), &message.chat_id).await?;
        let cascade = cascade::get_cascade_by_chat(self.db(), &message.chat_id).await?;
        if merchant.is_none() && cascade.is_none() && !message.is_private {
            return Ok(());
        }

        if let Some(merchant) = &merchant {
            let handler = merchant.handler_id.as_deref().unwrap_or(self.requester());
            self.credit(handler, StatKind::MerchantMessages, Some(&merchant.name), Utc::now())
                .await?;
        }

        let Some(deal_id) = deal_id::resolve(message, self.lookup(), &message.author_id).await
        else {
            return Ok(());
        };

        let keyword = self.config().callback_keyword.to_lowercase();
        if (merchant.is_some() || message.is_private)
            && message.full_text().to_lowercase().contains(&keyword)
        {
            return self
                .request_callback(message, &deal_id, merchant.is_some())
                .await;
        }

        if let Some(cascade) = &cascade {
            if message.media.is_empty() {
                return Ok(());
            }
            return self.forward_integrator_proof(message, &deal_id, cascade).await;
        }

        if message.is_private {
            if let Some(appeal) = appeal::get_appeal(self.db(), &deal_id).await? {
                return self.forward_appeal_proof(message, &deal_id, &appeal).await;
            }
        }

        self.submit_deal(message, &deal_id, merchant.as_ref())
            .await
            .map(|_| ())
    }

    /// Processes an edited message as new if the edit came soon after posting.
    pub async fn handle_edit(&self, message: &IncomingMessage, edited_at: DateTime<Utc>) -> Result<()> {
        let window = TimeDelta::try_seconds(self.config().edit_window_seconds).unwrap_or_default();
        if edited_at - message.posted_at > window {
            debug!(message_id = %message.message_id, "edit outside the edit window");
            return Ok(());
        }
        self.handle_message(message).await
    }

    /// Creates a deal for `deal_id` and hands it to the merchant's handler.
    ///
    /// Returns `None` when the order system does not know the id or the deal is already
    /// live.
    ///
    /// # Errors
    /// `OrderLookup` if the order system cannot be asked, `Unconfigured` if there is no
    /// handler to route to, `Transport` if the handler copy cannot be sent. In each case
    /// no deal is created.
    pub async fn submit_deal(
        &self,
        message: &IncomingMessage,
        deal_id: &str,
        merchant: Option<&merchant_entity::Model>,
    ) -> Result<Option<deal_entity::Model>> {
        let _guard = self.lock(deal_id).await;

        let Some(order) = self.lookup().get_order(deal_id, &message.author_id).await? else {
            debug!(deal_id, "order system does not know the deal");
            return Ok(None);
        };

        let existing = deal::get_live_deal(self.db(), deal_id).await?;
        if lifecycle::submit(existing.map(|deal| deal.status)).is_none() {
            debug!(deal_id, "deal already live");
            return Ok(None);
        }

        let handler_id = merchant
            .and_then(|merchant| merchant.handler_id.clone())
            .or_else(|| self.config().primary_admin().map(str::to_string))
            .ok_or_else(|| Error::Unconfigured {
                message: format!("no handler to route deal {deal_id} to"),
            })?;

        let cascade = self.matched_cascade(&order).await?;
        let copy = self
            .transport()
            .send(
                &ChatTarget::User(handler_id.clone()),
                OutgoingMessage::text(templates::deal_summary(&order, cascade.as_ref(), self.policy())?)
                    .with_media(message.media.clone())
                    .with_keyboard(templates::handler_keyboard(deal_id)),
            )
            .await?;

        let now = Utc::now();
        let txn = self.db().begin().await?;
        let created = deal::create_deal(
            &txn,
            deal::NewDeal {
                deal_id: deal_id.to_string(),
                merchant_chat_id: message.chat_id.clone(),
                message_id: message.message_id.clone(),
                sent_time: message.posted_at,
                merchant_id: merchant.map(|merchant| merchant.merchant_id.clone()),
                handler_id: handler_id.clone(),
            },
        )
        .await?;
        message_link::add_message(&txn, deal_id, &copy.chat_id, &copy.message_id, &handler_id, now)
            .await?;
        stats::add_stat(
            &txn,
            &handler_id,
            StatKind::Taken,
            Some(&order.merchant_name),
            1,
            self.today(now),
        )
        .await?;
        txn.commit().await?;
        info!(deal_id, handler_id = %handler_id, "deal submitted");

        if merchant.is_some() {
            let ack = self.acknowledge_submission(message, deal_id).await;
            self.settle("submission acknowledgement", Some(&handler_id), ack)
                .await;
        }
        Ok(Some(created))
    }

    async fn acknowledge_submission(&self, message: &IncomingMessage, deal_id: &str) -> Result<()> {
        self.transport()
            .send(
                &ChatTarget::Chat(message.chat_id.clone()),
                OutgoingMessage::text(templates::deal_accepted(deal_id))
                    .replying_to(message.reference()),
            )
            .await?;
        self.transport().set_reaction(&message.reference(), "👀").await
    }

    /// Asks the deal's integrator to resend its success callback.
    async fn request_callback(
        &self,
        message: &IncomingMessage,
        deal_id: &str,
        from_merchant_chat: bool,
    ) -> Result<()> {
        let Some(order) = self.lookup().get_order(deal_id, &message.author_id).await? else {
            return Ok(());
        };

        self.transport()
            .send(
                &ChatTarget::Chat(message.chat_id.clone()),
                OutgoingMessage::text(templates::callback_requested(deal_id))
                    .replying_to(message.reference()),
            )
            .await?;

        match self.route_integrator(&order).await? {
            Some((cascade, _)) => {
                if let Some(chat_id) = cascade.chat_id {
                    self.transport()
                        .send(
                            &ChatTarget::Chat(chat_id),
                            OutgoingMessage::text(templates::integrator_callback_request(deal_id)),
                        )
                        .await?;
                }
            }
            None => warn!(deal_id, integrator = %order.integrator_name, "no integrator chat for callback request"),
        }

        if from_merchant_chat {
            self.transport().set_reaction(&message.reference(), "⚡").await?;
        }
        info!(deal_id, "callback requested");
        Ok(())
    }

    /// Forwards integrator media about a rejected deal to its handler for review.
    async fn forward_integrator_proof(
        &self,
        message: &IncomingMessage,
        deal_id: &str,
        cascade: &cascade_entity::Model,
    ) -> Result<()> {
        let deal = match deal::get_latest_deal(self.db(), deal_id).await? {
            Some(deal) if deal.status == DealStatus::Rejected => deal,
            _ => {
                debug!(deal_id, "integrator media for a deal that is not rejected");
                return Ok(());
            }
        };

        let copy = self
            .transport()
            .send(
                &ChatTarget::User(deal.handler_id.clone()),
                OutgoingMessage::text(templates::integrator_proof(deal_id))
                    .with_media(message.media.clone())
                    .with_keyboard(templates::proof_keyboard(deal_id)),
            )
            .await?;

        let now = Utc::now();
        let txn = self.db().begin().await?;
        message_link::add_message(&txn, deal_id, &copy.chat_id, &copy.message_id, &message.author_id, now)
            .await?;
        appeal::add_proof_message(&txn, deal_id, &copy.message_id, now).await?;
        txn.commit().await?;
        info!(deal_id, cascade = %cascade.name, "integrator proof forwarded");

        let ack: Result<()> = async {
            self.transport()
                .send(
                    &ChatTarget::Chat(message.chat_id.clone()),
                    OutgoingMessage::text(templates::integrator_proof_received(deal_id))
                        .replying_to(message.reference()),
                )
                .await?;
            self.transport().set_reaction(&message.reference(), "👀").await
        }
        .await;
        self.settle("integrator proof acknowledgement", Some(&deal.handler_id), ack)
            .await;
        Ok(())
    }

    /// Forwards a DM about a deal under appeal to the appeal's owner.
    async fn forward_appeal_proof(
        &self,
        message: &IncomingMessage,
        deal_id: &str,
        appeal: &appeal_entity::Model,
    ) -> Result<()> {
        let mut text = templates::proofs_added(deal_id);
        let body = message.full_text();
        if !body.is_empty() {
            text.push('\n');
            text.push_str(&body);
        }

        let copy = self
            .transport()
            .send(
                &ChatTarget::User(appeal.user_id.clone()),
                OutgoingMessage::text(text).with_media(message.media.clone()),
            )
            .await?;

        let now = Utc::now();
        let txn = self.db().begin().await?;
        message_link::add_message(&txn, deal_id, &copy.chat_id, &copy.message_id, &message.author_id, now)
            .await?;
        appeal::add_proof_message(&txn, deal_id, &copy.message_id, now).await?;
        txn.commit().await?;
        info!(deal_id, owner = %appeal.user_id, "appeal proof forwarded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::message_link::{MessageFilter, get_messages};
    use crate::core::stats::get_stats;
    use crate::core::transport::{Media, MessageRef};
    use crate::test_utils::{
        RecordingTransport, ScriptedLookup, create_test_cascade, create_test_merchant, incoming,
        setup_test_db, test_desk, test_order,
    };
    use std::sync::Arc;

    const DEAL: &str = "a1b2c3d4-e5f6-7890-abcd-1234567890ab";

    struct Fixture {
        desk: DealDesk,
        lookup: Arc<ScriptedLookup>,
        transport: Arc<RecordingTransport>,
    }

    async fn fixture() -> Result<Fixture> {
        let db = setup_test_db().await?;
        create_test_merchant(&db, "shop", "merchant-chat", Some("handler")).await?;
        create_test_cascade(&db, "Acme", "acme-chat").await?;
        let lookup = Arc::new(ScriptedLookup::new());
        lookup.set(DEAL, test_order(DEAL, "Acme"));
        let transport = Arc::new(RecordingTransport::new());
        let desk = test_desk(db, Arc::clone(&lookup), Arc::clone(&transport))?;
        Ok(Fixture {
            desk,
            lookup,
            transport,
        })
    }

    fn photo() -> Media {
        Media {
            url: "https://cdn.example/receipt.png".to_string(),
            filename: "receipt.png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_merchant_message_creates_awaiting_deal() -> Result<()> {
        let f = fixture().await?;
        let message = incoming("merchant-chat", "100", "merchant-user", &format!("please check {DEAL}"));

        f.desk.handle_message(&message).await?;

        let deal = deal::get_live_deal(f.desk.db(), DEAL).await?.unwrap();
        assert_eq!(deal.status, DealStatus::Awaiting);
        assert_eq!(deal.handler_id, "handler");
        assert_eq!(deal.message_id, "100");

        let to_handler = f.transport.sent_to(&ChatTarget::User("handler".to_string()));
        assert_eq!(to_handler.len(), 1);
        assert!(to_handler[0].text.contains(DEAL));
        assert!(to_handler[0].keyboard.is_some());

        let ack = f.transport.sent_to(&ChatTarget::Chat("merchant-chat".to_string()));
        assert_eq!(ack.len(), 1);
        assert_eq!(
            f.transport.reactions(),
            vec![(MessageRef::new("merchant-chat", "100"), "👀".to_string())]
        );

        let links = get_messages(
            f.desk.db(),
            MessageFilter {
                deal_id: Some(DEAL),
                ..MessageFilter::default()
            },
        )
        .await?;
        assert_eq!(links.len(), 1);

        let stats = get_stats(f.desk.db(), "handler", f.desk.today(Utc::now())).await?;
        assert_eq!(stats.taken, 1);
        assert_eq!(stats.merchant_messages, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_submission_is_ignored() -> Result<()> {
        let f = fixture().await?;
        let message = incoming("merchant-chat", "100", "merchant-user", DEAL);
        f.desk.handle_message(&message).await?;
        f.desk.handle_message(&incoming("merchant-chat", "101", "merchant-user", DEAL)).await?;

        let live = deal::get_deals_by_status(f.desk.db(), &[DealStatus::Awaiting]).await?;
        assert_eq!(live.len(), 1);
        assert_eq!(f.transport.sent_to(&ChatTarget::User("handler".to_string())).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_deal_is_dropped_silently() -> Result<()> {
        let f = fixture().await?;
        let message = incoming(
            "merchant-chat",
            "100",
            "merchant-user",
            "00000000-1111-2222-3333-444444444444",
        );
        f.desk.handle_message(&message).await?;
        assert!(f.transport.sent().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_handler_send_creates_nothing() -> Result<()> {
        let f = fixture().await?;
        f.transport.fail_sends(true);
        let message = incoming("merchant-chat", "100", "merchant-user", DEAL);

        let result = f.desk.handle_message(&message).await;
        assert!(matches!(result, Err(Error::Transport { .. })));
        assert!(deal::get_latest_deal(f.desk.db(), DEAL).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_staff_chatter_in_merchant_chat_is_ignored() -> Result<()> {
        let f = fixture().await?;
        f.desk.handle_message(&incoming("merchant-chat", "100", "admin", DEAL)).await?;
        assert!(deal::get_latest_deal(f.desk.db(), DEAL).await?.is_none());
        assert_eq!(f.lookup.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_private_submission_goes_to_primary_admin() -> Result<()> {
        let f = fixture().await?;
        let mut message = incoming("dm-chat", "5", "stranger", DEAL);
        message.is_private = true;

        f.desk.handle_message(&message).await?;

        let deal = deal::get_live_deal(f.desk.db(), DEAL).await?.unwrap();
        assert_eq!(deal.handler_id, "admin");
        assert!(deal.merchant_id.is_none());
        // No acknowledgement or reaction outside merchant chats.
        assert!(f.transport.sent_to(&ChatTarget::Chat("dm-chat".to_string())).is_empty());
        assert!(f.transport.reactions().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_callback_keyword_pings_integrator() -> Result<()> {
        let f = fixture().await?;
        let message = incoming(
            "merchant-chat",
            "100",
            "merchant-user",
            &format!("Callback request {DEAL}"),
        );

        f.desk.handle_message(&message).await?;

        assert!(deal::get_latest_deal(f.desk.db(), DEAL).await?.is_none());
        let to_integrator = f.transport.sent_to(&ChatTarget::Chat("acme-chat".to_string()));
        assert_eq!(to_integrator.len(), 1);
        assert!(to_integrator[0].text.contains(DEAL));
        assert_eq!(f.transport.reactions()[0].1, "⚡");
        Ok(())
    }

    #[tokio::test]
    async fn test_integrator_proof_for_rejected_deal_reaches_handler() -> Result<()> {
        let f = fixture().await?;
        f.desk.handle_message(&incoming("merchant-chat", "100", "merchant-user", DEAL)).await?;
        let live = deal::get_live_deal(f.desk.db(), DEAL).await?.unwrap();
        deal::update_status(f.desk.db(), live, DealStatus::Rejected, Utc::now()).await?;

        let merchant_chat = ChatTarget::Chat("merchant-chat".to_string());
        let merchant_before = f.transport.sent_to(&merchant_chat).len();

        let mut proof = incoming("acme-chat", "300", "integrator-user", DEAL);
        proof.media = vec![photo()];
        f.desk.handle_message(&proof).await?;

        // The merchant only sees the proof once the handler accepts it.
        assert_eq!(f.transport.sent_to(&merchant_chat).len(), merchant_before);
        let ack = f.transport.sent_to(&ChatTarget::Chat("acme-chat".to_string()));
        assert_eq!(ack.len(), 1);
        assert_eq!(ack[0].reply_to, Some(MessageRef::new("acme-chat", "300")));
        assert!(f.transport.reactions().iter().any(|(on, emoji)| on.message_id == "300" && emoji == "👀"));

        let to_handler = f.transport.sent_to(&ChatTarget::User("handler".to_string()));
        let forwarded = to_handler.last().unwrap();
        assert_eq!(forwarded.media, vec![photo()]);
        assert!(forwarded.keyboard.is_some());
        assert_eq!(appeal::get_proof_messages(f.desk.db(), DEAL).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_dm_about_appealed_deal_is_forwarded_to_owner() -> Result<()> {
        let f = fixture().await?;
        appeal::create_appeal(f.desk.db(), DEAL, "handler", true, Utc::now()).await?;

        let mut message = incoming("dm-chat", "7", "merchant-user", &format!("{DEAL} here is the statement"));
        message.is_private = true;
        message.media = vec![photo()];
        f.desk.handle_message(&message).await?;

        assert!(deal::get_latest_deal(f.desk.db(), DEAL).await?.is_none());
        let forwarded = f.transport.sent_to(&ChatTarget::User("handler".to_string()));
        assert_eq!(forwarded.len(), 1);
        assert!(forwarded[0].text.contains("here is the statement"));
        assert_eq!(appeal::get_proof_messages(f.desk.db(), DEAL).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_late_edit_is_ignored() -> Result<()> {
        let f = fixture().await?;
        let message = incoming("merchant-chat", "100", "merchant-user", DEAL);

        f.desk
            .handle_edit(&message, message.posted_at + TimeDelta::seconds(31))
            .await?;
        assert!(deal::get_latest_deal(f.desk.db(), DEAL).await?.is_none());

        f.desk
            .handle_edit(&message, message.posted_at + TimeDelta::seconds(10))
            .await?;
        assert!(deal::get_live_deal(f.desk.db(), DEAL).await?.is_some());
        Ok(())
    }
}

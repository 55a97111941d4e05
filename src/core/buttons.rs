//! Button presses.
//!
//! Handler buttons arrive from DMs with the bot, integrator buttons from cascade chats.
//! Every press is authorised first, then the deal is re-read under its lock and the
//! transition table decides what happens.

use crate::core::action::{Action, RejectReason};
use crate::core::desk::DealDesk;
use crate::core::lifecycle::{Outcome, Trigger};
use crate::core::matcher::MatchKind;
use crate::core::transport::{ButtonPress, ChatTarget, MessageRef, OutgoingMessage};
use crate::core::{cascade, deal, merchant, message_link, shift, staff, stats, templates};
use crate::entities::{DealStatus, StatKind, cascade as cascade_entity, deal as deal_entity};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::TransactionTrait;
use tracing::{debug, info, warn};

impl DealDesk {
    /// Dispatches a button press.
    ///
    /// # Errors
    /// `Unauthorized` when the presser may not take the action, `DealNotFound` for a
    /// deal that is no longer live, `InvalidTransition` when the deal's status does not
    /// allow it, `LateAction` for integrator rejections after the deadline.
    pub async fn handle_press(&self, press: &ButtonPress) -> Result<()> {
        debug!(
            action = press.action.verb(),
            deal_id = press.action.deal_id().unwrap_or("-"),
            actor = %press.actor_id,
            "button pressed"
        );
        match &press.action {
            Action::Approve { deal_id } => self.approve(press, deal_id).await,
            Action::Reject { deal_id } => self.ask_reason(press, deal_id).await,
            Action::View { deal_id } => self.view(press, deal_id).await,
            Action::IntegratorApprove { deal_id } => self.integrator_approve(press, deal_id).await,
            Action::IntegratorReject { deal_id } => self.integrator_reject(press, deal_id).await,
            Action::Reason { reason, deal_id } => self.reject(press, deal_id, *reason).await,
            Action::ProofAccept { deal_id } => self.accept_proof(press, deal_id).await,
            Action::ProofDecline { deal_id } => self.decline_proof(press, deal_id).await,
            Action::ShiftStop { confirmed } => self.confirm_shift_stop(press, *confirmed).await,
            Action::ToggleMerchant { name } => self.toggle_merchant(press, name).await,
        }
    }

    /// Closes a user's shift: ends the shift record, purges every deal that is not
    /// waiting on an integrator and renders the day's report.
    pub async fn close_shift(&self, user_id: &str, now: DateTime<Utc>) -> Result<String> {
        if shift::stop_shift(self.db(), user_id, now).await?.is_none() {
            warn!(user_id, "closing shift with no open shift");
        }
        let purged = self.purge_deals().await?;
        info!(user_id, purged, "shift closed");

        let date = self.today(now);
        let day_stats = stats::get_stats(self.db(), user_id, date).await?;
        let pending: Vec<String> =
            deal::get_deals_by_status(self.db(), &[DealStatus::AwaitingIntegrator])
                .await?
                .into_iter()
                .map(|deal| deal.deal_id)
                .collect();
        let report = templates::stats_report(
            &date.format("%Y-%m-%d").to_string(),
            &format!("<@{user_id}>"),
            &day_stats,
            &pending,
        )?;
        Ok(templates::shift_stop_report(
            &report,
            purged,
            &self.policy().local_time(now),
        ))
    }

    /// Deletes every deal not waiting on an integrator, one at a time under its lock.
    ///
    /// A deal that moved to `awaiting_integrator` while the purge waited for its lock is
    /// kept.
    async fn purge_deals(&self) -> Result<u64> {
        let keep = DealStatus::AwaitingIntegrator;
        let mut purged = 0;
        for candidate in deal::get_deals_except(self.db(), keep).await? {
            let _guard = self.lock(&candidate.deal_id).await;
            match deal::get_deal_by_id(self.db(), candidate.id).await? {
                Some(current) if current.status != keep => {
                    if deal::delete_deal(self.db(), current.id).await? {
                        purged += 1;
                    }
                }
                Some(_) => debug!(deal_id = %candidate.deal_id, "deal escalated during purge, kept"),
                None => {}
            }
        }
        Ok(purged)
    }

    async fn require_handler(&self, press: &ButtonPress) -> Result<()> {
        staff::require_staff(self.db(), self.config(), &press.actor_id, press.action.verb()).await
    }

    async fn require_integrator_chat(&self, press: &ButtonPress) -> Result<cascade_entity::Model> {
        cascade::get_cascade_by_chat(self.db(), &press.chat_id)
            .await?
            .ok_or_else(|| Error::Unauthorized {
                user_id: press.actor_id.clone(),
                action: format!("{} outside an integrator chat", press.action.verb()),
            })
    }

    /// The live deal behind a press; a stale button is removed.
    async fn pressed_deal(&self, press: &ButtonPress, deal_id: &str) -> Result<deal_entity::Model> {
        match deal::get_live_deal(self.db(), deal_id).await? {
            Some(deal) => Ok(deal),
            None => {
                if let Err(e) = self.transport().delete(&press.reference()).await {
                    debug!(deal_id, error = %e, "could not remove stale button message");
                }
                Err(Error::DealNotFound {
                    deal_id: deal_id.to_string(),
                })
            }
        }
    }

    async fn approve(&self, press: &ButtonPress, deal_id: &str) -> Result<()> {
        self.require_handler(press).await?;
        let _guard = self.lock(deal_id).await;
        let deal = self.pressed_deal(press, deal_id).await?;
        let order = self.fetch_order(deal_id, &press.actor_id).await?;
        let route = self.route_integrator(&order).await?;
        let transition = Self::step(
            &deal,
            Trigger::Approve {
                integrator_bound: route.is_some(),
            },
        )?;
        let now = Utc::now();

        if let (Outcome::EscalateToIntegrator, Some((cascade, kind))) = (transition.outcome, route) {
            let chat_id = cascade.chat_id.clone().ok_or_else(|| Error::Unconfigured {
                message: format!("cascade {} has no chat", cascade.name),
            })?;
            let copy = self
                .transport()
                .send(
                    &ChatTarget::Chat(chat_id),
                    OutgoingMessage::text(templates::deal_summary(&order, Some(&cascade), self.policy())?)
                        .with_keyboard(templates::integrator_keyboard(deal_id)),
                )
                .await?;

            let txn = self.db().begin().await?;
            deal::update_status(&txn, deal, transition.to, now).await?;
            message_link::add_message(&txn, deal_id, &copy.chat_id, &copy.message_id, &press.actor_id, now)
                .await?;
            stats::add_stat(
                &txn,
                &press.actor_id,
                StatKind::Approved,
                Some(&order.merchant_name),
                1,
                self.today(now),
            )
            .await?;
            txn.commit().await?;
            info!(deal_id, cascade = %cascade.name, "deal escalated to integrator");

            if let MatchKind::Approximate { distance } = kind {
                debug!(deal_id, distance, "integrator matched approximately");
                self.notify_admins(&templates::partial_integrator_match(
                    deal_id,
                    &order.integrator_name,
                    &cascade.name,
                ))
                .await;
            }
            let cleanup = self.transport().delete(&press.reference()).await;
            self.settle("handler button cleanup", Some(&press.actor_id), cleanup)
                .await;
            return Ok(());
        }

        deal::update_status(self.db(), deal, transition.to, now).await?;
        info!(deal_id, "deal handed to manual processing");
        let notice: Result<()> = async {
            self.transport()
                .send(
                    &ChatTarget::Chat(press.chat_id.clone()),
                    OutgoingMessage::text(templates::handle_manually(deal_id, &order.integrator_name)),
                )
                .await?;
            self.transport().delete(&press.reference()).await
        }
        .await;
        self.settle("manual processing notice", Some(&press.actor_id), notice)
            .await;
        Ok(())
    }

    async fn ask_reason(&self, press: &ButtonPress, deal_id: &str) -> Result<()> {
        self.require_handler(press).await?;
        let deal = self.pressed_deal(press, deal_id).await?;
        Self::step(&deal, Trigger::Reject)?;
        self.transport()
            .edit_markup(&press.reference(), Some(templates::reason_keyboard(deal_id)))
            .await
    }

    async fn view(&self, press: &ButtonPress, deal_id: &str) -> Result<()> {
        self.require_handler(press).await?;
        let _guard = self.lock(deal_id).await;
        let deal = self.pressed_deal(press, deal_id).await?;
        Self::step(&deal, Trigger::View)?;

        let message = press.reference();
        self.transport()
            .edit_text(&message, &format!("{}\n{}", press.text, templates::VIEWED))
            .await?;
        self.transport().edit_markup(&message, None).await?;
        self.credit(&press.actor_id, StatKind::Viewed, None, Utc::now())
            .await
    }

    async fn integrator_approve(&self, press: &ButtonPress, deal_id: &str) -> Result<()> {
        let cascade = self.require_integrator_chat(press).await?;
        let _guard = self.lock(deal_id).await;
        let deal = self.pressed_deal(press, deal_id).await?;
        let order = self.fetch_order(deal_id, self.requester()).await?;
        let transition = Self::step(
            &deal,
            Trigger::IntegratorApprove {
                external_success: order.status.is_success(),
            },
        )?;

        if transition.outcome != Outcome::Complete {
            debug!(deal_id, status = %order.status, "integrator approved before the callback");
            self.transport()
                .send(
                    &ChatTarget::Chat(press.chat_id.clone()),
                    OutgoingMessage::text(templates::integrator_approve_error(deal_id))
                        .replying_to(press.reference()),
                )
                .await?;
            return Ok(());
        }

        let handler_id = deal.handler_id.clone();
        self.complete_deal(deal, &order.merchant_name, Utc::now())
            .await?;
        info!(deal_id, cascade = %cascade.name, "integrator confirmed deal");
        let cleanup = self.transport().delete(&press.reference()).await;
        self.settle("integrator button cleanup", Some(&handler_id), cleanup)
            .await;
        Ok(())
    }

    async fn integrator_reject(&self, press: &ButtonPress, deal_id: &str) -> Result<()> {
        self.require_integrator_chat(press).await?;
        let deal = self.pressed_deal(press, deal_id).await?;
        let now = Utc::now();
        let transition = Self::step(
            &deal,
            Trigger::IntegratorReject {
                sla_elapsed: self.policy().is_elapsed(deal.sent_time, now),
            },
        )?;

        if transition.outcome == Outcome::AskRejectReason {
            return self
                .transport()
                .edit_markup(&press.reference(), Some(templates::reason_keyboard(deal_id)))
                .await;
        }

        warn!(deal_id, "integrator rejection after the deadline");
        let text = templates::integrator_reject_late(deal_id);
        self.transport()
            .send(
                &ChatTarget::Chat(deal.merchant_chat_id.clone()),
                OutgoingMessage::text(text.clone())
                    .replying_to(MessageRef::new(&deal.merchant_chat_id, &deal.message_id)),
            )
            .await?;
        let to_handler = self
            .transport()
            .send(&ChatTarget::User(deal.handler_id.clone()), OutgoingMessage::text(text))
            .await
            .map(|_| ());
        self.settle("late rejection notice", Some(&deal.handler_id), to_handler)
            .await;
        Err(Error::LateAction {
            deal_id: deal_id.to_string(),
            action: press.action.verb().to_string(),
        })
    }

    async fn reject(&self, press: &ButtonPress, deal_id: &str, reason: RejectReason) -> Result<()> {
        if !staff::is_staff(self.db(), self.config(), &press.actor_id).await? {
            self.require_integrator_chat(press).await?;
        }
        let _guard = self.lock(deal_id).await;
        let deal = self.pressed_deal(press, deal_id).await?;
        let transition = Self::step(&deal, Trigger::ReasonChosen)?;
        let merchant_name = merchant::get_merchant_by_chat(self.db(), &deal.merchant_chat_id)
            .await?
            .map(|merchant| merchant.name);

        let now = Utc::now();
        let txn = self.db().begin().await?;
        let rejected = deal::update_status(&txn, deal, transition.to, now).await?;
        stats::add_stat(
            &txn,
            &rejected.handler_id,
            StatKind::Rejected,
            merchant_name.as_deref(),
            1,
            self.today(now),
        )
        .await?;
        txn.commit().await?;
        info!(deal_id, reason = %reason, actor = %press.actor_id, "deal rejected");

        let origin = MessageRef::new(&rejected.merchant_chat_id, &rejected.message_id);
        let notice: Result<()> = async {
            self.transport()
                .send(
                    &ChatTarget::Chat(rejected.merchant_chat_id.clone()),
                    OutgoingMessage::text(templates::deal_rejected(deal_id, reason))
                        .replying_to(origin.clone()),
                )
                .await?;
            self.transport().set_reaction(&origin, "👎").await
        }
        .await;
        self.settle("rejection notice", Some(&rejected.handler_id), notice)
            .await;
        self.notify_admins(&templates::rejection_notice(deal_id, reason, &press.actor_id))
            .await;
        let cleanup = self.transport().delete(&press.reference()).await;
        self.settle("reason button cleanup", Some(&rejected.handler_id), cleanup)
            .await;
        Ok(())
    }

    async fn accept_proof(&self, press: &ButtonPress, deal_id: &str) -> Result<()> {
        self.require_handler(press).await?;
        let deal = deal::get_latest_deal(self.db(), deal_id)
            .await?
            .ok_or_else(|| Error::DealNotFound {
                deal_id: deal_id.to_string(),
            })?;

        self.transport()
            .send(
                &ChatTarget::Chat(deal.merchant_chat_id.clone()),
                OutgoingMessage::text(templates::integrator_proof_sent(deal_id))
                    .with_media(press.media.clone())
                    .replying_to(MessageRef::new(&deal.merchant_chat_id, &deal.message_id)),
            )
            .await?;
        info!(deal_id, "proof passed to merchant");
        let cleanup = self.transport().delete(&press.reference()).await;
        self.settle("proof button cleanup", Some(&press.actor_id), cleanup)
            .await;
        Ok(())
    }

    async fn decline_proof(&self, press: &ButtonPress, deal_id: &str) -> Result<()> {
        self.require_handler(press).await?;
        let message = press.reference();
        self.transport()
            .edit_text(&message, &format!("{}{}", press.text, templates::PROOF_DECLINED))
            .await?;
        self.transport().edit_markup(&message, None).await?;
        debug!(deal_id, "proof declined");
        Ok(())
    }

    async fn confirm_shift_stop(&self, press: &ButtonPress, confirmed: bool) -> Result<()> {
        self.require_handler(press).await?;
        let chat = ChatTarget::Chat(press.chat_id.clone());
        let text = if confirmed {
            self.close_shift(&press.actor_id, Utc::now()).await?
        } else {
            templates::SHIFT_STOP_CANCELLED.to_string()
        };
        self.transport().send(&chat, OutgoingMessage::text(text)).await?;
        let cleanup = self.transport().delete(&press.reference()).await;
        self.settle("shift prompt cleanup", Some(&press.actor_id), cleanup)
            .await;
        Ok(())
    }

    async fn toggle_merchant(&self, press: &ButtonPress, name: &str) -> Result<()> {
        self.require_handler(press).await?;
        let is_admin = self.config().is_admin(&press.actor_id);
        let (merchant, claimed) =
            merchant::toggle_claim(self.db(), name, &press.actor_id, is_admin).await?;
        info!(merchant = %merchant.name, actor = %press.actor_id, claimed, "merchant toggled");

        let text = if claimed {
            format!("🏪 {} is now yours", merchant.display_name)
        } else {
            format!("🏪 {} released", merchant.display_name)
        };
        let merchants = merchant::get_all_merchants(self.db()).await?;
        let message = press.reference();
        self.transport().edit_text(&message, &text).await?;
        self.transport()
            .edit_markup(&message, Some(templates::merchant_keyboard(&merchants, &press.actor_id)))
            .await
    }
}

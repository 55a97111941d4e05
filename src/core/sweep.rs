//! SLA reconciliation sweep.
//!
//! On every tick the sweep walks the deals still waiting on someone. `awaiting` deals past
//! their deadline get a breach notice to the handler; `awaiting_integrator` deals are
//! re-checked against the order system and completed once it reports success.

use crate::config::BreachNotify;
use crate::core::desk::DealDesk;
use crate::core::lifecycle::{Outcome, Trigger};
use crate::core::transport::{ChatTarget, OutgoingMessage};
use crate::core::{deal, merchant, notification, templates};
use crate::entities::{DealStatus, deal as deal_entity};
use crate::errors::Result;
use chrono::{DateTime, Utc};
use sea_orm::Iterable;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What one sweep pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Breach notices sent
    pub breached: usize,
    /// Deals completed on external confirmation
    pub completed: usize,
    /// Deals whose check failed
    pub failed: usize,
}

enum Swept {
    Breached,
    Completed,
    Untouched,
}

impl DealDesk {
    /// Runs one sweep pass at `now`.
    ///
    /// A failure on one deal is reported and counted; the pass carries on with the rest.
    ///
    /// # Errors
    /// Only if the list of deals to sweep cannot be read.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let statuses: Vec<DealStatus> = DealStatus::iter().filter(|s| s.is_swept()).collect();
        let candidates = deal::get_deals_by_status(self.db(), &statuses).await?;

        let mut report = SweepReport::default();
        for candidate in candidates {
            match self.sweep_deal(&candidate, now).await {
                Ok(Swept::Breached) => report.breached += 1,
                Ok(Swept::Completed) => report.completed += 1,
                Ok(Swept::Untouched) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(deal_id = %candidate.deal_id, error = %e, "sweep failed for deal");
                    self.report_error(&e, Some(&candidate.handler_id)).await;
                }
            }
        }
        Ok(report)
    }

    async fn sweep_deal(&self, candidate: &deal_entity::Model, now: DateTime<Utc>) -> Result<Swept> {
        let _guard = self.lock(&candidate.deal_id).await;
        // Re-read under the lock: a press may have moved the deal since the listing.
        let Some(deal) = deal::get_deal_by_id(self.db(), candidate.id).await? else {
            return Ok(Swept::Untouched);
        };

        match deal.status {
            DealStatus::Awaiting => self.check_deadline(deal, now).await,
            DealStatus::AwaitingIntegrator => self.poll_order(deal, now).await,
            _ => Ok(Swept::Untouched),
        }
    }

    async fn check_deadline(&self, deal: deal_entity::Model, now: DateTime<Utc>) -> Result<Swept> {
        let transition = Self::step(
            &deal,
            Trigger::SlaCheck {
                elapsed: self.policy().is_elapsed(deal.sent_time, now),
            },
        )?;
        if transition.outcome != Outcome::NotifySlaBreach {
            return Ok(Swept::Untouched);
        }
        if self.config().sla.notify == BreachNotify::Once
            && notification::notified_since(self.db(), &deal.deal_id, deal.sent_time).await?
        {
            return Ok(Swept::Untouched);
        }

        let merchant_name = merchant::get_merchant_by_chat(self.db(), &deal.merchant_chat_id)
            .await?
            .map_or_else(|| deal.merchant_chat_id.clone(), |merchant| merchant.display_name);
        let sent = self
            .transport()
            .send(
                &ChatTarget::User(deal.handler_id.clone()),
                OutgoingMessage::text(templates::sla_expired(&deal.deal_id, &merchant_name)),
            )
            .await;

        match sent {
            Ok(message) => {
                notification::record_notification(self.db(), &deal.deal_id, Some(message.message_id), true, now)
                    .await?;
                info!(deal_id = %deal.deal_id, handler_id = %deal.handler_id, "SLA breach notified");
                Ok(Swept::Breached)
            }
            Err(e) => {
                notification::record_notification(self.db(), &deal.deal_id, None, false, now)
                    .await?;
                Err(e)
            }
        }
    }

    async fn poll_order(&self, deal: deal_entity::Model, now: DateTime<Utc>) -> Result<Swept> {
        let order = self.fetch_order(&deal.deal_id, self.requester()).await?;
        let transition = Self::step(
            &deal,
            Trigger::ExternalPoll {
                external_success: order.status.is_success(),
            },
        )?;
        if transition.outcome != Outcome::Complete {
            debug!(deal_id = %deal.deal_id, status = %order.status, "still waiting on integrator");
            return Ok(Swept::Untouched);
        }

        self.complete_deal(deal, &order.merchant_name, now).await?;
        Ok(Swept::Completed)
    }
}

/// Runs the sweep every `poll_interval_seconds` until `cancel` fires.
///
/// A pass in progress always finishes; cancellation is only observed between passes.
pub async fn run_sweeper(desk: Arc<DealDesk>, cancel: CancellationToken) {
    let period = Duration::from_secs(desk.config().poll_interval_seconds);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(seconds = period.as_secs(), "sweeper started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("sweeper stopped");
                break;
            }
            _ = interval.tick() => {
                match desk.sweep(Utc::now()).await {
                    Ok(report) if report == SweepReport::default() => debug!("sweep pass idle"),
                    Ok(report) => info!(
                        breached = report.breached,
                        completed = report.completed,
                        failed = report.failed,
                        "sweep pass finished"
                    ),
                    Err(e) => {
                        error!(error = %e, "sweep pass failed");
                        desk.report_error(&e, None).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::stats::get_stats;
    use crate::order_api::OrderStatus;
    use crate::test_utils::{
        RecordingTransport, ScriptedLookup, create_test_deal, create_test_merchant, setup_test_db,
        test_config, test_desk, test_desk_with, test_order,
    };
    use chrono::TimeDelta;

    const DEAL: &str = "a1b2c3d4-e5f6-7890-abcd-1234567890ab";
    const OTHER: &str = "b1b2c3d4-e5f6-7890-abcd-1234567890ab";

    fn handler() -> ChatTarget {
        ChatTarget::User("handler".to_string())
    }

    #[tokio::test]
    async fn test_breach_is_notified_once_per_waiting_period() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_merchant(&db, "shop", "merchant-chat", Some("handler")).await?;
        let created = create_test_deal(&db, DEAL, "merchant-chat", "handler").await?;
        let transport = Arc::new(RecordingTransport::new());
        let desk = test_desk(db, Arc::new(ScriptedLookup::new()), Arc::clone(&transport))?;

        let on_time = desk.sweep(created.sent_time + TimeDelta::seconds(1)).await?;
        assert_eq!(on_time, SweepReport::default());

        let late = created.sent_time + TimeDelta::hours(3);
        assert_eq!(desk.sweep(late).await?.breached, 1);
        assert_eq!(desk.sweep(late + TimeDelta::minutes(1)).await?.breached, 0);

        let notices = transport.sent_to(&handler());
        assert_eq!(notices.len(), 1);
        assert!(notices[0].text.contains(DEAL));
        // Breach notices never change the deal.
        let deal = deal::get_live_deal(desk.db(), DEAL).await?.unwrap();
        assert_eq!(deal.status, DealStatus::Awaiting);
        Ok(())
    }

    #[tokio::test]
    async fn test_repeat_policy_notifies_every_pass() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_deal(&db, DEAL, "merchant-chat", "handler").await?;
        let mut config = test_config();
        config.sla.notify = BreachNotify::Repeat;
        let transport = Arc::new(RecordingTransport::new());
        let desk = test_desk_with(db, Arc::new(ScriptedLookup::new()), Arc::clone(&transport), config)?;

        let late = created.sent_time + TimeDelta::hours(3);
        desk.sweep(late).await?;
        desk.sweep(late + TimeDelta::seconds(20)).await?;
        assert_eq!(transport.sent_to(&handler()).len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_external_success_completes_awaiting_integrator() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_merchant(&db, "shop", "merchant-chat", Some("handler")).await?;
        let created = create_test_deal(&db, DEAL, "merchant-chat", "handler").await?;
        deal::update_status(&db, created, DealStatus::AwaitingIntegrator, Utc::now()).await?;
        let lookup = Arc::new(ScriptedLookup::new());
        lookup.set(DEAL, test_order(DEAL, "Acme"));
        let transport = Arc::new(RecordingTransport::new());
        let desk = test_desk(db, Arc::clone(&lookup), Arc::clone(&transport))?;

        assert_eq!(desk.sweep(Utc::now()).await?, SweepReport::default());

        lookup.set_status(DEAL, OrderStatus::Success);
        let report = desk.sweep(Utc::now()).await?;
        assert_eq!(report.completed, 1);

        let deal = deal::get_latest_deal(desk.db(), DEAL).await?.unwrap();
        assert_eq!(deal.status, DealStatus::Completed);
        assert_eq!(
            transport.sent_to(&ChatTarget::Chat("merchant-chat".to_string())).len(),
            1
        );
        let stats = get_stats(desk.db(), "handler", desk.today(Utc::now())).await?;
        assert_eq!(stats.completed, 1);

        // Completed deals drop out of the sweep.
        assert_eq!(desk.sweep(Utc::now()).await?, SweepReport::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_lookup_failure_is_isolated_to_one_deal() -> Result<()> {
        let db = setup_test_db().await?;
        for deal_id in [DEAL, OTHER] {
            let created = create_test_deal(&db, deal_id, "merchant-chat", "handler").await?;
            deal::update_status(&db, created, DealStatus::AwaitingIntegrator, Utc::now()).await?;
        }
        let lookup = Arc::new(ScriptedLookup::new());
        lookup.fail(DEAL);
        let mut order = test_order(OTHER, "Acme");
        order.status = OrderStatus::Success;
        lookup.set(OTHER, order);
        let transport = Arc::new(RecordingTransport::new());
        let desk = test_desk(db, Arc::clone(&lookup), Arc::clone(&transport))?;

        let report = desk.sweep(Utc::now()).await?;
        assert_eq!(report.failed, 1);
        assert_eq!(report.completed, 1);

        let failed = deal::get_latest_deal(desk.db(), DEAL).await?.unwrap();
        assert_eq!(failed.status, DealStatus::AwaitingIntegrator);
        // The failure is reported to the admins.
        assert_eq!(
            transport.sent_to(&ChatTarget::User("admin".to_string())).len(),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_cancel() -> Result<()> {
        let db = setup_test_db().await?;
        let desk = Arc::new(test_desk(
            db,
            Arc::new(ScriptedLookup::new()),
            Arc::new(RecordingTransport::new()),
        )?);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_sweeper(desk, cancel.clone()));

        cancel.cancel();
        let joined = tokio::time::timeout(Duration::from_secs(5), task).await;
        assert!(matches!(joined, Ok(Ok(()))));
        Ok(())
    }
}

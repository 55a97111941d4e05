//! The deal desk: store, order lookup and chat transport wired together.
//!
//! [`DealDesk`] owns the collaborators every transition needs. Intake, button handling
//! and the reconciliation sweep are implemented on it in `intake`, `buttons` and `sweep`.
//!
//! Ordering rule for every transition: messages that must exist for the new state to make
//! sense (the handler copy of a new deal, the integrator copy of an escalated deal) are
//! sent before the store commit, so a failed send leaves the deal untouched. Notices sent
//! after the commit are best effort; their failures are reported to the operators.

use crate::config::DeskConfig;
use crate::core::lifecycle::{self, Transition, Trigger};
use crate::core::locks::DealLocks;
use crate::core::matcher::{self, MatchKind};
use crate::core::sla::SlaPolicy;
use crate::core::transport::{ChatTarget, ChatTransport, MessageRef, OutgoingMessage};
use crate::core::{cascade, deal, stats, templates};
use crate::entities::{DealStatus, StatKind, cascade as cascade_entity, deal as deal_entity};
use crate::errors::{Error, Result};
use crate::order_api::{OrderLookup, OrderRecord};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, warn};

/// Requester identity used when no admin is configured
const FALLBACK_REQUESTER: &str = "desk";

/// Orchestrates deal transitions
pub struct DealDesk {
    db: DatabaseConnection,
    lookup: Arc<dyn OrderLookup>,
    transport: Arc<dyn ChatTransport>,
    config: Arc<DeskConfig>,
    policy: SlaPolicy,
    locks: DealLocks,
}

impl DealDesk {
    /// Creates a desk; fails if the SLA settings do not parse.
    pub fn new(
        db: DatabaseConnection,
        lookup: Arc<dyn OrderLookup>,
        transport: Arc<dyn ChatTransport>,
        config: Arc<DeskConfig>,
    ) -> Result<Self> {
        let policy = SlaPolicy::from_config(&config.sla)?;
        Ok(Self {
            db,
            lookup,
            transport,
            config,
            policy,
            locks: DealLocks::new(),
        })
    }

    /// Database connection
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Desk configuration
    #[must_use]
    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    /// SLA policy
    #[must_use]
    pub const fn policy(&self) -> &SlaPolicy {
        &self.policy
    }

    /// Chat transport
    #[must_use]
    pub fn transport(&self) -> &dyn ChatTransport {
        self.transport.as_ref()
    }

    /// Order lookup
    #[must_use]
    pub fn lookup(&self) -> &dyn OrderLookup {
        self.lookup.as_ref()
    }

    /// Identity the desk itself uses for order lookups
    #[must_use]
    pub fn requester(&self) -> &str {
        self.config.primary_admin().unwrap_or(FALLBACK_REQUESTER)
    }

    /// Desk-local date of `now`
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.policy.local_date(now)
    }

    pub(crate) async fn lock(&self, deal_id: &str) -> OwnedMutexGuard<()> {
        self.locks.lock(deal_id).await
    }

    /// Fetches an order that must exist.
    ///
    /// # Errors
    /// `DealNotFound` if the order system does not know the id, `OrderLookup` if it
    /// could not be asked.
    pub(crate) async fn fetch_order(&self, deal_id: &str, requester: &str) -> Result<OrderRecord> {
        self.lookup
            .get_order(deal_id, requester)
            .await?
            .ok_or_else(|| Error::DealNotFound {
                deal_id: deal_id.to_string(),
            })
    }

    /// Looks up the transition for `trigger`, or `InvalidTransition`.
    pub(crate) fn step(deal: &deal_entity::Model, trigger: Trigger) -> Result<Transition> {
        lifecycle::transition(deal.status, trigger).ok_or_else(|| Error::InvalidTransition {
            deal_id: deal.deal_id.clone(),
            from: deal.status,
            action: trigger.verb().to_string(),
        })
    }

    /// Cascade with a bound chat for the order's integrator, with how it matched.
    pub(crate) async fn route_integrator(
        &self,
        order: &OrderRecord,
    ) -> Result<Option<(cascade_entity::Model, MatchKind)>> {
        let cascades = cascade::get_all_cascades(&self.db).await?;
        Ok(matcher::match_cascade(&order.integrator_name, &cascades)
            .filter(|found| found.cascade.chat_id.is_some())
            .map(|found| (found.cascade.clone(), found.kind)))
    }

    /// The cascade the order's integrator name resolves to, bound to a chat or not.
    pub(crate) async fn matched_cascade(
        &self,
        order: &OrderRecord,
    ) -> Result<Option<cascade_entity::Model>> {
        let cascades = cascade::get_all_cascades(&self.db).await?;
        Ok(matcher::match_cascade(&order.integrator_name, &cascades).map(|found| found.cascade.clone()))
    }

    /// Credits one unit of `kind` to `user_id` for today.
    pub(crate) async fn credit(
        &self,
        user_id: &str,
        kind: StatKind,
        merchant_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        stats::add_stat(&self.db, user_id, kind, merchant_name, 1, self.today(now)).await
    }

    /// Sends `text` to every admin; failures are only logged.
    pub(crate) async fn notify_admins(&self, text: &str) {
        for admin in &self.config.admin_ids {
            let target = ChatTarget::User(admin.clone());
            if let Err(e) = self.transport.send(&target, OutgoingMessage::text(text)).await {
                warn!(admin = %admin, error = %e, "could not notify admin");
            }
        }
    }

    /// Reports a fault to the operators and counts it against the handler involved.
    ///
    /// Never fails: a report that cannot be delivered is logged.
    pub async fn report_error(&self, error: &Error, handler_id: Option<&str>) {
        error!(error = %error, handler_id = ?handler_id, "desk error");
        self.notify_admins(&templates::error_report(&error.to_string()))
            .await;
        let Some(handler_id) = handler_id else {
            return;
        };
        if let Err(e) = self.credit(handler_id, StatKind::Errors, None, Utc::now()).await {
            warn!(handler_id, error = %e, "could not record error stat");
        }
    }

    /// Logs and reports the failure of a best-effort step that ran after a commit.
    pub(crate) async fn settle(&self, step: &str, handler_id: Option<&str>, result: Result<()>) {
        if let Err(e) = result {
            warn!(step, error = %e, "post-commit delivery failed");
            self.report_error(&e, handler_id).await;
        }
    }

    /// Moves a deal awaiting its integrator to `completed` and tells the merchant.
    ///
    /// The caller must hold the deal's lock.
    pub(crate) async fn complete_deal(
        &self,
        deal: deal_entity::Model,
        merchant_name: &str,
        now: DateTime<Utc>,
    ) -> Result<deal_entity::Model> {
        let txn = self.db.begin().await?;
        let completed = deal::update_status(&txn, deal, DealStatus::Completed, now).await?;
        stats::add_stat(
            &txn,
            &completed.handler_id,
            StatKind::Completed,
            Some(merchant_name),
            1,
            self.today(now),
        )
        .await?;
        txn.commit().await?;
        info!(deal_id = %completed.deal_id, "deal completed");

        let notice = self.announce_completion(&completed).await;
        self.settle("completion notice", Some(&completed.handler_id), notice)
            .await;
        Ok(completed)
    }

    async fn announce_completion(&self, deal: &deal_entity::Model) -> Result<()> {
        let origin = MessageRef::new(&deal.merchant_chat_id, &deal.message_id);
        self.transport
            .send(
                &ChatTarget::Chat(deal.merchant_chat_id.clone()),
                OutgoingMessage::text(templates::deal_completed(&deal.deal_id))
                    .replying_to(origin.clone()),
            )
            .await?;
        self.transport.set_reaction(&origin, "👍").await
    }
}

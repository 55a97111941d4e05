//! Deal lifecycle transition table.
//!
//! This module only decides. Given a deal's current status and what happened, it returns
//! the next status and what the desk has to do about it; `core::desk` performs the writes
//! and notifications. Anything absent from the table is an invalid transition.

use crate::entities::DealStatus;

/// Something that happened to a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Handler pressed approve; `integrator_bound` says whether a cascade chat was resolved
    Approve {
        /// A cascade with a bound chat matched the deal's integrator
        integrator_bound: bool,
    },
    /// Handler pressed reject
    Reject,
    /// A rejection reason was picked
    ReasonChosen,
    /// Handler pressed view
    View,
    /// Integrator pressed approve
    IntegratorApprove {
        /// The order system reports success
        external_success: bool,
    },
    /// Integrator pressed reject
    IntegratorReject {
        /// The deal's SLA deadline has passed
        sla_elapsed: bool,
    },
    /// The sweep checked an `awaiting` deal's deadline
    SlaCheck {
        /// The deadline has passed
        elapsed: bool,
    },
    /// The sweep polled the order system for an `awaiting_integrator` deal
    ExternalPoll {
        /// The order system reports success
        external_success: bool,
    },
}

impl Trigger {
    /// Verb used in refusals
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Approve { .. } | Self::IntegratorApprove { .. } => "approve",
            Self::Reject | Self::IntegratorReject { .. } => "reject",
            Self::ReasonChosen => "choose a rejection reason for",
            Self::View => "view",
            Self::SlaCheck { .. } => "check the deadline of",
            Self::ExternalPoll { .. } => "poll",
        }
    }
}

/// What the desk must do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Send the deal to the integrator chat
    EscalateToIntegrator,
    /// Tell the handler to finish the deal by hand
    HandleManually,
    /// Swap the buttons for the reason keyboard
    AskRejectReason,
    /// Tell the merchant and admins the deal was rejected
    Reject,
    /// Record the view and strip the buttons
    MarkViewed,
    /// Tell the merchant the deal is done
    Complete,
    /// Tell the integrator the external callback is required first
    AwaitExternalConfirmation,
    /// Refuse a rejection that came after the deadline
    RefuseLateRejection,
    /// Tell the handler the deadline passed
    NotifySlaBreach,
    /// Nothing to do
    NoChange,
}

/// Result of applying a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Status before
    pub from: DealStatus,
    /// Status after
    pub to: DealStatus,
    /// Side effect to perform
    pub outcome: Outcome,
}

impl Transition {
    /// Whether the status must be written
    #[must_use]
    pub fn changes_status(&self) -> bool {
        self.from != self.to
    }
}

/// Looks up the transition for `trigger` from `from`; `None` means the action is not allowed
#[must_use]
pub const fn transition(from: DealStatus, trigger: Trigger) -> Option<Transition> {
    use DealStatus::{Awaiting, AwaitingIntegrator, Completed, PendingManual, Rejected};

    let (to, outcome) = match (from, trigger) {
        (Awaiting, Trigger::Approve { integrator_bound: true }) => {
            (AwaitingIntegrator, Outcome::EscalateToIntegrator)
        }
        (Awaiting, Trigger::Approve { integrator_bound: false }) => {
            (PendingManual, Outcome::HandleManually)
        }
        (Awaiting | AwaitingIntegrator, Trigger::Reject) => (from, Outcome::AskRejectReason),
        (Awaiting | AwaitingIntegrator, Trigger::ReasonChosen) => (Rejected, Outcome::Reject),
        (Awaiting, Trigger::View) => (Awaiting, Outcome::MarkViewed),
        (AwaitingIntegrator, Trigger::IntegratorApprove { external_success: true })
        | (AwaitingIntegrator, Trigger::ExternalPoll { external_success: true }) => {
            (Completed, Outcome::Complete)
        }
        (AwaitingIntegrator, Trigger::IntegratorApprove { external_success: false }) => {
            (AwaitingIntegrator, Outcome::AwaitExternalConfirmation)
        }
        (AwaitingIntegrator, Trigger::IntegratorReject { sla_elapsed: false }) => {
            (AwaitingIntegrator, Outcome::AskRejectReason)
        }
        (AwaitingIntegrator, Trigger::IntegratorReject { sla_elapsed: true }) => {
            (AwaitingIntegrator, Outcome::RefuseLateRejection)
        }
        (Awaiting, Trigger::SlaCheck { elapsed: true }) => (Awaiting, Outcome::NotifySlaBreach),
        (Awaiting, Trigger::SlaCheck { elapsed: false })
        | (AwaitingIntegrator, Trigger::ExternalPoll { external_success: false }) => {
            (from, Outcome::NoChange)
        }
        _ => return None,
    };

    Some(Transition { from, to, outcome })
}

/// Status a newly resolved deal is created in.
///
/// Returns `None` when a live record for the same deal id already exists.
#[must_use]
pub const fn submit(existing: Option<DealStatus>) -> Option<DealStatus> {
    match existing {
        Some(status) if status.is_live() => None,
        _ => Some(DealStatus::Awaiting),
    }
}

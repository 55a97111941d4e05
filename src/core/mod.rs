//! Core desk logic - framework-agnostic deal routing, lifecycle and reconciliation.
//!
//! Nothing in here knows about Discord; the bot layer feeds normalised messages and
//! button presses into [`DealDesk`] and implements [`transport::ChatTransport`].

/// Button payloads and rejection reasons
pub mod action;
/// Appeals and forwarded proofs
pub mod appeal;
/// Integrator (cascade) records
pub mod cascade;
/// Deal records
pub mod deal;
/// Deal id extraction and validation
pub mod deal_id;
/// The desk itself and its shared helpers
pub mod desk;
/// Deal lifecycle transition table
pub mod lifecycle;
/// Per-deal locks
pub mod locks;
/// Integrator name matching
pub mod matcher;
/// Merchant records and claims
pub mod merchant;
/// Links between deals and the messages sent about them
pub mod message_link;
/// SLA breach notification log
pub mod notification;
/// Staff shifts
pub mod shift;
/// SLA deadline policy
pub mod sla;
/// Staff roster and authorisation
pub mod staff;
/// Daily statistics
pub mod stats;
/// Reconciliation sweep
pub mod sweep;
/// Message texts and keyboards
pub mod templates;
/// Platform-neutral chat surface
pub mod transport;

mod buttons;
mod intake;

pub use desk::DealDesk;
pub use sweep::{SweepReport, run_sweeper};

//! Button actions.
//!
//! Every button the desk renders carries one [`Action`], encoded into the platform's
//! button payload with [`Action::encode`] and decoded exactly once with [`Action::parse`]
//! when pressed.

use crate::errors::{Error, Result};
use std::fmt;

/// Why a deal was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The payment proof is fake
    Fake,
    /// Wrong recipient details
    WrongRecipient,
    /// The integrator needs its own order id to proceed
    RequestExternalId,
    /// No payment was received
    NoPayment,
    /// Anything else
    Other,
}

impl RejectReason {
    /// All reasons, in keyboard order
    pub const ALL: [Self; 5] = [
        Self::Fake,
        Self::WrongRecipient,
        Self::RequestExternalId,
        Self::NoPayment,
        Self::Other,
    ];

    /// Short code used in button payloads
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Fake => "fake",
            Self::WrongRecipient => "rec",
            Self::RequestExternalId => "request_external_id",
            Self::NoPayment => "no_payment",
            Self::Other => "other",
        }
    }

    /// Human readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fake => "Fake receipt",
            Self::WrongRecipient => "Wrong recipient details",
            Self::RequestExternalId => "Provide the integrator's order id",
            Self::NoPayment => "Payment not received",
            Self::Other => "Other",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reason| reason.code() == code)
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Closed set of things a button can mean
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Handler approves the deal
    Approve {
        /// Deal concerned
        deal_id: String,
    },
    /// Handler asks to reject the deal
    Reject {
        /// Deal concerned
        deal_id: String,
    },
    /// Handler takes the deal into manual processing
    View {
        /// Deal concerned
        deal_id: String,
    },
    /// Integrator confirms the deal
    IntegratorApprove {
        /// Deal concerned
        deal_id: String,
    },
    /// Integrator asks to reject the deal
    IntegratorReject {
        /// Deal concerned
        deal_id: String,
    },
    /// A rejection reason was picked
    Reason {
        /// Chosen reason
        reason: RejectReason,
        /// Deal concerned
        deal_id: String,
    },
    /// Handler accepts an integrator proof and forwards it to the merchant
    ProofAccept {
        /// Deal concerned
        deal_id: String,
    },
    /// Handler declines an integrator proof
    ProofDecline {
        /// Deal concerned
        deal_id: String,
    },
    /// Shift close confirmation
    ShiftStop {
        /// Whether the user confirmed
        confirmed: bool,
    },
    /// Claim or release a merchant
    ToggleMerchant {
        /// Merchant name
        name: String,
    },
}

impl Action {
    /// Decodes a button payload.
    pub fn parse(data: &str) -> Result<Self> {
        let invalid = || Error::InvalidAction {
            data: data.to_string(),
        };
        let (tag, rest) = data.split_once(':').ok_or_else(invalid)?;
        if rest.is_empty() {
            return Err(invalid());
        }

        let deal_id = || rest.to_string();
        let action = match tag {
            "approve" => Self::Approve { deal_id: deal_id() },
            "reject" => Self::Reject { deal_id: deal_id() },
            "view" => Self::View { deal_id: deal_id() },
            "iapprove" => Self::IntegratorApprove { deal_id: deal_id() },
            "ireject" => Self::IntegratorReject { deal_id: deal_id() },
            "proof_ok" => Self::ProofAccept { deal_id: deal_id() },
            "proof_no" => Self::ProofDecline { deal_id: deal_id() },
            "reason" => {
                let (code, deal_id) = rest.split_once(':').ok_or_else(invalid)?;
                let reason = RejectReason::from_code(code).ok_or_else(invalid)?;
                if deal_id.is_empty() {
                    return Err(invalid());
                }
                Self::Reason {
                    reason,
                    deal_id: deal_id.to_string(),
                }
            }
            "shift" => match rest {
                "yes" => Self::ShiftStop { confirmed: true },
                "no" => Self::ShiftStop { confirmed: false },
                _ => return Err(invalid()),
            },
            "merchant" => Self::ToggleMerchant { name: rest.to_string() },
            _ => return Err(invalid()),
        };
        Ok(action)
    }

    /// Encodes the action as a button payload
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Approve { deal_id } => format!("approve:{deal_id}"),
            Self::Reject { deal_id } => format!("reject:{deal_id}"),
            Self::View { deal_id } => format!("view:{deal_id}"),
            Self::IntegratorApprove { deal_id } => format!("iapprove:{deal_id}"),
            Self::IntegratorReject { deal_id } => format!("ireject:{deal_id}"),
            Self::Reason { reason, deal_id } => format!("reason:{}:{deal_id}", reason.code()),
            Self::ProofAccept { deal_id } => format!("proof_ok:{deal_id}"),
            Self::ProofDecline { deal_id } => format!("proof_no:{deal_id}"),
            Self::ShiftStop { confirmed } => {
                format!("shift:{}", if *confirmed { "yes" } else { "no" })
            }
            Self::ToggleMerchant { name } => format!("merchant:{name}"),
        }
    }

    /// Deal the action refers to, if any
    #[must_use]
    pub fn deal_id(&self) -> Option<&str> {
        match self {
            Self::Approve { deal_id }
            | Self::Reject { deal_id }
            | Self::View { deal_id }
            | Self::IntegratorApprove { deal_id }
            | Self::IntegratorReject { deal_id }
            | Self::Reason { deal_id, .. }
            | Self::ProofAccept { deal_id }
            | Self::ProofDecline { deal_id } => Some(deal_id),
            Self::ShiftStop { .. } | Self::ToggleMerchant { .. } => None,
        }
    }

    /// Short verb for logs and refusals
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Approve { .. } | Self::IntegratorApprove { .. } => "approve",
            Self::Reject { .. } | Self::IntegratorReject { .. } => "reject",
            Self::View { .. } => "view",
            Self::Reason { .. } => "choose a rejection reason for",
            Self::ProofAccept { .. } => "accept proof for",
            Self::ProofDecline { .. } => "decline proof for",
            Self::ShiftStop { .. } => "stop a shift",
            Self::ToggleMerchant { .. } => "claim a merchant",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const DEAL: &str = "a1b2c3d4-e5f6-7890-abcd-1234567890ab";

    #[test]
    fn test_parse_reason_payload() {
        let action = Action::parse(&format!("reason:no_payment:{DEAL}")).unwrap();
        assert_eq!(
            action,
            Action::Reason {
                reason: RejectReason::NoPayment,
                deal_id: DEAL.to_string(),
            }
        );
        assert_eq!(action.deal_id(), Some(DEAL));
    }

    #[test]
    fn test_encode_parses_back() {
        let actions = [
            Action::Approve {
                deal_id: DEAL.to_string(),
            },
            Action::IntegratorReject {
                deal_id: DEAL.to_string(),
            },
            Action::Reason {
                reason: RejectReason::RequestExternalId,
                deal_id: DEAL.to_string(),
            },
            Action::ShiftStop { confirmed: false },
            Action::ToggleMerchant {
                name: "shop:one".to_string(),
            },
        ];
        for action in actions {
            assert_eq!(Action::parse(&action.encode()).unwrap(), action);
        }
    }

    #[test]
    fn test_rejects_unknown_payloads() {
        for data in ["", "approve", "approve:", "launch:abc", "reason:nope:abc", "shift:maybe"] {
            assert!(
                matches!(Action::parse(data), Err(Error::InvalidAction { .. })),
                "{data} should not parse"
            );
        }
    }
}

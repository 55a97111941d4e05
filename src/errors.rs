//! Unified error types for `DealDesk`.
//!
//! Every layer returns [`Result`]. The bot layer decides per variant whether an error is a
//! refusal the actor should simply be told about ([`Error::is_user_facing`]) or a fault
//! that must also reach the operators.

use crate::entities::DealStatus;
use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// Any failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The order API could not be reached or answered with an unexpected status
    #[error("Order lookup failed for {deal_id}: {message}")]
    OrderLookup {
        /// Deal that was being looked up
        deal_id: String,
        /// Description of the failure
        message: String,
    },

    /// The deal id is unknown to the order API or to the store
    #[error("Deal not found: {deal_id}")]
    DealNotFound {
        /// The missing deal
        deal_id: String,
    },

    /// The actor lacks permission for the requested step
    #[error("User {user_id} is not allowed to {action}")]
    Unauthorized {
        /// Who pressed or typed
        user_id: String,
        /// What they tried to do
        action: String,
    },

    /// A merchant, integrator or handler binding required for the step is missing
    #[error("Not configured: {message}")]
    Unconfigured {
        /// What is missing
        message: String,
    },

    /// The action arrived after its governing SLA window closed
    #[error("{action} on deal {deal_id} refused: SLA window has closed")]
    LateAction {
        /// The deal concerned
        deal_id: String,
        /// The refused action
        action: String,
    },

    /// The lifecycle has no transition for this action from the deal's current status
    #[error("Cannot {action} deal {deal_id} while it is {from}")]
    InvalidTransition {
        /// The deal concerned
        deal_id: String,
        /// Status the deal was in
        from: DealStatus,
        /// The attempted action
        action: String,
    },

    /// Button payload that does not decode to a known action
    #[error("Unrecognised action data: {data}")]
    InvalidAction {
        /// The raw payload
        data: String,
    },

    /// A merchant, cascade, staff member or appeal with this key already exists
    #[error("{entity} '{name}' already exists")]
    AlreadyExists {
        /// Kind of record
        entity: &'static str,
        /// Its key
        name: String,
    },

    /// A merchant, cascade or staff member that was named does not exist
    #[error("{entity} '{name}' not found")]
    NotFound {
        /// Kind of record
        entity: &'static str,
        /// The key that was looked up
        name: String,
    },

    /// The user already has a shift that has not been stopped
    #[error("User {user_id} already has an open shift")]
    ShiftAlreadyOpen {
        /// The user concerned
        user_id: String,
    },

    /// Sending, editing, deleting or reacting failed on the chat platform
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the failure
        message: String,
    },

    /// HTTP client failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Formatting error while building message text
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Refusals and misses that only need a terse reply to the actor.
    ///
    /// Everything else is a fault and is additionally routed to the operators.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::DealNotFound { .. }
                | Self::Unauthorized { .. }
                | Self::Unconfigured { .. }
                | Self::LateAction { .. }
                | Self::InvalidTransition { .. }
                | Self::InvalidAction { .. }
                | Self::AlreadyExists { .. }
                | Self::NotFound { .. }
                | Self::ShiftAlreadyOpen { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusals_are_user_facing() {
        let late = Error::LateAction {
            deal_id: "d".to_string(),
            action: "reject".to_string(),
        };
        assert!(late.is_user_facing());

        let lookup = Error::OrderLookup {
            deal_id: "d".to_string(),
            message: "timeout".to_string(),
        };
        assert!(!lookup.is_user_facing());
    }

    #[test]
    fn test_invalid_transition_message_names_status() {
        let err = Error::InvalidTransition {
            deal_id: "abc".to_string(),
            from: DealStatus::Completed,
            action: "approve".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot approve deal abc while it is completed"
        );
    }
}

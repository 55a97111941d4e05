//! Discord interaction handlers
//!
//! This module provides handlers for gateway events (messages, edits, button presses)
//! and autocomplete for command parameters.

/// Autocomplete handlers for merchant and cascade names
pub mod autocomplete;
/// Gateway event routing into the desk
pub mod events;

pub use events::event_handler;

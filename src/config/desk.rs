//! Desk configuration loading from config.toml
//!
//! Everything that is policy rather than secret lives here: who the admins are, the SLA
//! windows, how often the sweep runs. Secrets (bot token, order API credentials) are read
//! from the environment at the point of use. Every field has a default, so an empty
//! config.toml is valid.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Users allowed to run admin commands; they receive operator error reports
    pub admin_ids: Vec<String>,
    /// Users admitted as staff in addition to those added with `add_user`
    pub staff_ids: Vec<String>,
    /// External order API settings
    pub order_api: OrderApiConfig,
    /// SLA windows and breach policy
    pub sla: SlaConfig,
    /// Seconds between two reconciliation sweeps
    pub poll_interval_seconds: u64,
    /// Edits made within this many seconds of posting are processed like new messages
    pub edit_window_seconds: i64,
    /// Phrase that turns a deal message into an external-callback request
    pub callback_keyword: String,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            admin_ids: Vec::new(),
            staff_ids: Vec::new(),
            order_api: OrderApiConfig::default(),
            sla: SlaConfig::default(),
            poll_interval_seconds: 20,
            edit_window_seconds: 30,
            callback_keyword: "callback request".to_string(),
        }
    }
}

impl DeskConfig {
    /// Whether the user is a configured admin
    #[must_use]
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.iter().any(|id| id == user_id)
    }

    /// First configured admin: default handler and requester identity for the sweep
    #[must_use]
    pub fn primary_admin(&self) -> Option<&str> {
        self.admin_ids.first().map(String::as_str)
    }

    /// Rejects combinations that would make the desk misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.admin_ids.is_empty() {
            return Err(Error::Config {
                message: "at least one admin id is required".to_string(),
            });
        }
        if self.poll_interval_seconds == 0 {
            return Err(Error::Config {
                message: "poll_interval_seconds must be positive".to_string(),
            });
        }
        if self.callback_keyword.trim().is_empty() {
            return Err(Error::Config {
                message: "callback_keyword cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Order API connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrderApiConfig {
    /// Base URL, ending in a slash (e.g. `https://api.example.com/api/v1/`)
    pub base_url: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Attempts per lookup before giving up
    pub max_attempts: u32,
}

impl Default for OrderApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1/".to_string(),
            timeout_seconds: 15,
            max_attempts: 3,
        }
    }
}

/// Which instant's time of day selects the day or night SLA window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineBasis {
    /// The moment the deadline is checked; a deal's deadline can shift at the day/night boundary
    Evaluation,
    /// The moment the deal entered its awaiting status; the deadline never moves
    Submission,
}

/// How often a breached deal is reported to its handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachNotify {
    /// One notice per waiting period
    Once,
    /// A notice on every sweep while the breach lasts
    Repeat,
}

/// SLA window configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlaConfig {
    /// Window length during the day
    pub day_seconds: i64,
    /// Window length outside the day range
    pub night_seconds: i64,
    /// Start of the day range, `HH:MM` desk-local
    pub day_start: String,
    /// End of the day range (inclusive), `HH:MM` desk-local
    pub day_end: String,
    /// Offset of desk-local time from UTC
    pub utc_offset_hours: i32,
    /// Which instant selects the window
    pub basis: DeadlineBasis,
    /// Breach notice policy
    pub notify: BreachNotify,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            day_seconds: 2400,
            night_seconds: 3600,
            day_start: "10:00".to_string(),
            day_end: "22:00".to_string(),
            utc_offset_hours: 3,
            basis: DeadlineBasis::Evaluation,
            notify: BreachNotify::Once,
        }
    }
}

/// Loads the desk configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DeskConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads the configuration named by `DESK_CONFIG`, or ./config.toml
pub fn load_default_config() -> Result<DeskConfig> {
    let path = std::env::var("DESK_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}

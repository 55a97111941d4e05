//! SLA deadline policy.
//!
//! A deal's deadline is `sent_time` plus the day or night window. Which window applies
//! depends on the desk-local time of day of the basis instant, see [`DeadlineBasis`].

use crate::config::{DeadlineBasis, SlaConfig};
use crate::errors::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};

/// Parsed, ready-to-use SLA settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaPolicy {
    day_window: TimeDelta,
    night_window: TimeDelta,
    day_start: NaiveTime,
    day_end: NaiveTime,
    offset: FixedOffset,
    basis: DeadlineBasis,
}

fn parse_time(raw: &str, field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| Error::Config {
        message: format!("sla.{field} must be HH:MM, got '{raw}': {e}"),
    })
}

fn window(seconds: i64, field: &str) -> Result<TimeDelta> {
    TimeDelta::try_seconds(seconds)
        .filter(|window| *window > TimeDelta::zero())
        .ok_or_else(|| Error::Config {
            message: format!("sla.{field} must be a positive number of seconds"),
        })
}

impl SlaPolicy {
    /// Builds the policy, validating every field
    pub fn from_config(config: &SlaConfig) -> Result<Self> {
        let offset = config
            .utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| Error::Config {
                message: format!("sla.utc_offset_hours {} is out of range", config.utc_offset_hours),
            })?;

        Ok(Self {
            day_window: window(config.day_seconds, "day_seconds")?,
            night_window: window(config.night_seconds, "night_seconds")?,
            day_start: parse_time(&config.day_start, "day_start")?,
            day_end: parse_time(&config.day_end, "day_end")?,
            offset,
            basis: config.basis,
        })
    }

    /// Whether `at` falls inside the inclusive desk-local day range
    #[must_use]
    pub fn is_day_time(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.offset).time();
        self.day_start <= local && local <= self.day_end
    }

    /// Window length selected by the time of day of `at`
    #[must_use]
    pub fn window(&self, at: DateTime<Utc>) -> TimeDelta {
        if self.is_day_time(at) {
            self.day_window
        } else {
            self.night_window
        }
    }

    /// Deadline of a deal that entered its awaiting status at `sent_time`, as seen at `now`
    #[must_use]
    pub fn deadline(&self, sent_time: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        let basis = match self.basis {
            DeadlineBasis::Evaluation => now,
            DeadlineBasis::Submission => sent_time,
        };
        sent_time + self.window(basis)
    }

    /// Whether the deadline has passed; the deadline instant itself is still on time
    #[must_use]
    pub fn is_elapsed(&self, sent_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now > self.deadline(sent_time, now)
    }

    /// Desk-local calendar date, the key of daily stats
    #[must_use]
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Desk-local wall clock time, for messages
    #[must_use]
    pub fn local_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%H:%M:%S").to_string()
    }

    /// Desk-local timestamp, for messages
    #[must_use]
    pub fn local_timestamp(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format("%d.%m.%Y %H:%M")
            .to_string()
    }
}

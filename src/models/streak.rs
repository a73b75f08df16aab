//! Daily streak record and its state machine.
//!
//! A streak counts consecutive days with activity. Up to [`MAX_REVIVES`]
//! missed gaps are forgiven over the lifetime of a record; after that a gap
//! resets the count to 1. The budget only comes back when the record itself
//! expires from inactivity.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Lifetime revive budget of a streak record.
pub const MAX_REVIVES: u32 = 3;

/// Hash field names as stored in the key-value store.
pub mod fields {
    pub const CURRENT: &str = "current";
    pub const LAST_DATE: &str = "last_date";
    pub const REVIVES_USED: &str = "revives_used";
    pub const VERSION: &str = "version";
}

/// Persisted streak state for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakRecord {
    /// Consecutive-day count
    pub current: u32,
    /// Last day that counted
    pub last_date: NaiveDate,
    /// Gaps forgiven so far, at most `MAX_REVIVES`
    pub revives_used: u32,
}

/// What a call to [`StreakRecord::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTransition {
    /// No prior record: started at 1
    Started,
    /// Already counted today
    Unchanged,
    /// Activity on the day after `last_date`
    Extended,
    /// Gap forgiven, revive spent
    Revived,
    /// Gap with no revives left: back to 1
    Reset,
}

/// Stored fields that could not be decoded.
#[derive(Debug, thiserror::Error)]
#[error("invalid streak field {field}: {value:?}")]
pub struct StreakDecodeError {
    pub field: &'static str,
    pub value: String,
}

impl StreakRecord {
    /// A fresh record for first activity on `today`.
    pub fn start(today: NaiveDate) -> Self {
        Self {
            current: 1,
            last_date: today,
            revives_used: 0,
        }
    }

    /// Compute the state after activity on `today`.
    ///
    /// A `last_date` after `today` is treated as already counted.
    pub fn advance(previous: Option<&Self>, today: NaiveDate) -> (Self, StreakTransition) {
        let Some(prev) = previous else {
            return (Self::start(today), StreakTransition::Started);
        };

        let gap = (today - prev.last_date).num_days();
        if gap <= 0 {
            return (*prev, StreakTransition::Unchanged);
        }

        if gap == 1 {
            let next = Self {
                current: prev.current.saturating_add(1),
                last_date: today,
                revives_used: prev.revives_used,
            };
            return (next, StreakTransition::Extended);
        }

        if prev.revives_used < MAX_REVIVES {
            let next = Self {
                current: prev.current.saturating_add(1),
                last_date: today,
                revives_used: prev.revives_used + 1,
            };
            (next, StreakTransition::Revived)
        } else {
            let next = Self {
                current: 1,
                last_date: today,
                revives_used: prev.revives_used,
            };
            (next, StreakTransition::Reset)
        }
    }

    /// Decode from a stored hash. An empty hash means no record.
    pub fn from_fields(map: &HashMap<String, String>) -> Result<Option<Self>, StreakDecodeError> {
        if map.is_empty() {
            return Ok(None);
        }

        let raw = |field: &'static str| map.get(field).map(String::as_str).unwrap_or("");
        let decode_error = |field: &'static str| StreakDecodeError {
            field,
            value: raw(field).to_string(),
        };

        let current = raw(fields::CURRENT)
            .parse::<u32>()
            .map_err(|_| decode_error(fields::CURRENT))?;
        let last_date = NaiveDate::parse_from_str(raw(fields::LAST_DATE), "%Y-%m-%d")
            .map_err(|_| decode_error(fields::LAST_DATE))?;
        let revives_used = match map.get(fields::REVIVES_USED) {
            None => 0,
            Some(v) => v
                .parse::<u32>()
                .map_err(|_| decode_error(fields::REVIVES_USED))?
                .min(MAX_REVIVES),
        };

        Ok(Some(Self {
            current,
            last_date,
            revives_used,
        }))
    }

    /// Encode as hash fields, stamped with `version`.
    pub fn to_fields(&self, version: u64) -> Vec<(String, String)> {
        vec![
            (fields::CURRENT.to_string(), self.current.to_string()),
            (
                fields::LAST_DATE.to_string(),
                self.last_date.format("%Y-%m-%d").to_string(),
            ),
            (fields::REVIVES_USED.to_string(), self.revives_used.to_string()),
            (fields::VERSION.to_string(), version.to_string()),
        ]
    }
}

/// Streak summary returned to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakInfo {
    pub current: u32,
    pub revives_used: u32,
}

impl From<&StreakRecord> for StreakInfo {
    fn from(record: &StreakRecord) -> Self {
        Self {
            current: record.current,
            revives_used: record.revives_used,
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily streak engine.
//!
//! The key-value store is the only owner of streak state: one hash per user
//! under `streak:<user_id>`, refreshed to the full TTL on every write and
//! purged by the store after a TTL of inactivity.
//!
//! Updates are an optimistic compare-and-swap on the hash's `version` field,
//! so concurrent calls for the same user cannot both apply an increment.

use crate::cache::{keys, KeyValueStore};
use crate::error::{AppError, Result};
use crate::models::streak::fields;
use crate::models::{StreakInfo, StreakRecord, StreakTransition};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

/// Attempts before a contended update gives up.
pub const MAX_CAS_ATTEMPTS: usize = 8;

/// Per-user consecutive-day activity counter.
#[derive(Clone)]
pub struct StreakEngine {
    cache: Arc<dyn KeyValueStore>,
    ttl_secs: u64,
}

impl StreakEngine {
    pub fn new(cache: Arc<dyn KeyValueStore>, ttl_secs: u64) -> Self {
        Self { cache, ttl_secs }
    }

    /// Count activity on `today`. Repeat calls on the same day are no-ops.
    pub async fn record_activity(&self, user_id: &str, today: NaiveDate) -> Result<StreakInfo> {
        let key = keys::streak(user_id);

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let stored = self.cache.hash_get_all(&key).await?;
            let version = stored.get(fields::VERSION).cloned();
            let previous = decode(user_id, &stored);

            let (next, transition) = StreakRecord::advance(previous.as_ref(), today);
            if transition == StreakTransition::Unchanged {
                return Ok(StreakInfo::from(&next));
            }

            let new_version = next_version(version.as_deref());

            let written = self
                .cache
                .hash_compare_and_set(
                    &key,
                    fields::VERSION,
                    version.as_deref(),
                    &next.to_fields(new_version),
                    self.ttl_secs,
                )
                .await?;

            if written {
                tracing::debug!(
                    user_id,
                    ?transition,
                    current = next.current,
                    revives_used = next.revives_used,
                    "Streak updated"
                );
                return Ok(StreakInfo::from(&next));
            }

            tracing::debug!(user_id, attempt, "Streak write lost a race, retrying");
        }

        tracing::warn!(user_id, "Streak update abandoned after repeated conflicts");
        Err(AppError::Conflict(
            "Streak is being updated concurrently, try again".to_string(),
        ))
    }

    /// Current streak, or `{0, 0}` if the user has no live record.
    pub async fn get_streak(&self, user_id: &str) -> Result<StreakInfo> {
        let stored = self.cache.hash_get_all(&keys::streak(user_id)).await?;
        Ok(decode(user_id, &stored)
            .map(|record| StreakInfo::from(&record))
            .unwrap_or_default())
    }
}

/// Version to stamp on the next write. A missing or unparsable version
/// counts as 0, and the counter sticks at `u64::MAX` rather than wrapping.
fn next_version(stored: Option<&str>) -> u64 {
    stored
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        .saturating_add(1)
}

/// Decode a stored hash. Corrupt records read as absent and get overwritten
/// by the next activity.
fn decode(user_id: &str, stored: &HashMap<String, String>) -> Option<StreakRecord> {
    match StreakRecord::from_fields(stored) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Ignoring corrupt streak record");
            None
        }
    }
}

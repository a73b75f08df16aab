// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process key-value store for local development and tests.
//!
//! Mirrors the subset of Redis semantics the core relies on: per-key expiry,
//! string and hash values, and `WRONGTYPE` errors when they are mixed.
//! Expiry is lazy and measured on the tokio clock, so tests can advance time
//! with a paused runtime.

use super::{CacheError, KeyValueStore};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

fn deadline(ttl_secs: u64) -> Option<Instant> {
    Some(Instant::now() + Duration::from_secs(ttl_secs))
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::Command(format!(
        "WRONGTYPE Operation against a key holding the wrong kind of value: {}",
        key
    ))
}

/// DashMap-backed store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, slot| {
            let expired = slot.is_expired();
            removed += usize::from(expired);
            !expired
        });
        removed
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the live slot for `key`, removing it if expired.
    fn live(&self, key: &str) -> Option<Slot> {
        let slot = self.entries.get(key).map(|r| r.value().clone())?;
        if slot.is_expired() {
            self.entries.remove_if(key, |_, s| s.is_expired());
            return None;
        }
        Some(slot)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.live(key) {
            None => Ok(None),
            Some(Slot {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            Slot {
                value: Value::Str(value.to_string()),
                expires_at: deadline(ttl_secs),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, slot)| !slot.is_expired()))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        match self.live(key) {
            None => Ok(HashMap::new()),
            Some(Slot {
                value: Value::Hash(fields),
                ..
            }) => Ok(fields),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_set(&self, key: &str, mapping: &[(String, String)]) -> Result<(), CacheError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(Slot {
                        value: Value::Hash(mapping.iter().cloned().collect()),
                        expires_at: None,
                    });
                    return Ok(());
                }
                match &mut occupied.get_mut().value {
                    Value::Hash(fields) => fields.extend(mapping.iter().cloned()),
                    Value::Str(_) => return Err(wrong_type(key)),
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    value: Value::Hash(mapping.iter().cloned().collect()),
                    expires_at: None,
                });
            }
        }
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, CacheError> {
        match self.entries.get_mut(key) {
            Some(mut slot) if !slot.is_expired() => {
                slot.expires_at = deadline(ttl_secs);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn hash_compare_and_set(
        &self,
        key: &str,
        version_field: &str,
        expected: Option<&str>,
        mapping: &[(String, String)],
        ttl_secs: u64,
    ) -> Result<bool, CacheError> {
        // The entry guard holds the shard lock for the whole compare and write.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    if expected.is_some() {
                        occupied.remove();
                        return Ok(false);
                    }
                    occupied.insert(Slot {
                        value: Value::Hash(mapping.iter().cloned().collect()),
                        expires_at: deadline(ttl_secs),
                    });
                    return Ok(true);
                }

                let slot = occupied.get_mut();
                let Value::Hash(fields) = &mut slot.value else {
                    return Err(wrong_type(key));
                };
                if fields.get(version_field).map(String::as_str) != expected {
                    return Ok(false);
                }
                fields.extend(mapping.iter().cloned());
                slot.expires_at = deadline(ttl_secs);
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                if expected.is_some() {
                    return Ok(false);
                }
                vacant.insert(Slot {
                    value: Value::Hash(mapping.iter().cloned().collect()),
                    expires_at: deadline(ttl_secs),
                });
                Ok(true)
            }
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key-value cache layer (Redis, or an in-process map for local runs).
//!
//! Both the identity cache and the streak engine talk to the store through
//! [`KeyValueStore`], so handlers never hold a concrete client.

pub mod memory;
pub mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use async_trait::async_trait;
use std::collections::HashMap;

/// Key namespaces shared by every store implementation.
pub mod keys {
    /// Cached user record, keyed by email.
    pub fn user_by_email(email: &str) -> String {
        format!("user:{}", email)
    }

    /// Cached user record, keyed by username.
    pub fn user_by_username(username: &str) -> String {
        format!("user_by_username:{}", username)
    }

    /// Streak hash for a user id.
    pub fn streak(user_id: &str) -> String {
        format!("streak:{}", user_id)
    }
}

/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Command failed: {0}")]
    Command(String),
}

/// Operations the core needs from a key-value store.
///
/// TTLs are in seconds. A hash that does not exist reads as an empty map.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a string value. `None` if missing or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set a string value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// Delete a key. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Read every field of a hash.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError>;

    /// Write fields into a hash, creating it if needed. Does not touch the TTL.
    async fn hash_set(&self, key: &str, mapping: &[(String, String)]) -> Result<(), CacheError>;

    /// Refresh a key's TTL. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, CacheError>;

    /// Atomically write `mapping` into a hash and refresh its TTL, but only
    /// if the hash's `version_field` still equals `expected`.
    ///
    /// `expected == None` matches a hash with no such field (including a
    /// missing hash). Returns `false` without writing on mismatch.
    async fn hash_compare_and_set(
        &self,
        key: &str,
        version_field: &str,
        expected: Option<&str>,
        mapping: &[(String, String)],
        ttl_secs: u64,
    ) -> Result<bool, CacheError>;
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-through identity cache.
//!
//! Maps an email or username to a user record. Records are cached as full
//! JSON snapshots under two keys, `user:<email>` and
//! `user_by_username:<username>`, with the same TTL. The two writes are
//! independent, so the keys can briefly point at different versions of a
//! record; the next read-through miss resynchronizes them.
//!
//! The cache is only an optimization: any cache fault is logged and the
//! lookup falls through to the document store.

use crate::cache::{keys, KeyValueStore};
use crate::db::{UserFilter, UserStore};
use crate::error::{AppError, Result};
use crate::models::{ProfileUpdate, User};
use std::sync::Arc;

/// Lookup key for [`IdentityCache::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey<'a> {
    Email(&'a str),
    Username(&'a str),
}

impl LookupKey<'_> {
    fn cache_key(&self) -> String {
        match self {
            LookupKey::Email(email) => keys::user_by_email(email),
            LookupKey::Username(username) => keys::user_by_username(username),
        }
    }

    fn filter(&self) -> UserFilter<'_> {
        match *self {
            LookupKey::Email(email) => UserFilter::Email(email),
            LookupKey::Username(username) => UserFilter::Username(username),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            LookupKey::Email(_) => "email",
            LookupKey::Username(_) => "username",
        }
    }
}

/// User lookups backed by the document store with a key-value cache in front.
#[derive(Clone)]
pub struct IdentityCache {
    users: Arc<dyn UserStore>,
    cache: Arc<dyn KeyValueStore>,
    ttl_secs: u64,
}

impl IdentityCache {
    pub fn new(users: Arc<dyn UserStore>, cache: Arc<dyn KeyValueStore>, ttl_secs: u64) -> Self {
        Self {
            users,
            cache,
            ttl_secs,
        }
    }

    /// Resolve a user, reading through to the document store on a miss.
    ///
    /// Misses are not cached: a key that matches nobody queries the store
    /// every time.
    pub async fn lookup(&self, key: LookupKey<'_>) -> Result<Option<User>> {
        let cache_key = key.cache_key();

        if let Some(user) = self.read_cached(&cache_key, key.kind()).await {
            tracing::debug!(kind = key.kind(), user_id = %user.id, "identity cache hit");
            return Ok(Some(user));
        }

        tracing::debug!(kind = key.kind(), "identity cache miss");
        let user = self.users.find_user(key.filter()).await?;

        if let Some(user) = &user {
            self.cache_user(user).await;
        }
        Ok(user)
    }

    pub async fn lookup_by_email(&self, email: &str) -> Result<Option<User>> {
        self.lookup(LookupKey::Email(email)).await
    }

    pub async fn lookup_by_username(&self, username: &str) -> Result<Option<User>> {
        self.lookup(LookupKey::Username(username)).await
    }

    /// Store the full record under its email key and, if it has one, its
    /// username key. Failures are logged and ignored.
    pub async fn cache_user(&self, user: &User) {
        let encoded = match serde_json::to_string(user) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to encode user for cache");
                return;
            }
        };

        self.write_key(&keys::user_by_email(&user.email), &encoded).await;
        if let Some(username) = user.username_key() {
            self.write_key(&keys::user_by_username(username), &encoded).await;
        }
    }

    /// Apply a profile update and refresh the cache from the merged record.
    ///
    /// The document store is written first. The cache is then repopulated
    /// from `current` with the update merged in, so fields the store computes
    /// itself (`updated_at`) stay stale in the cache until the entry expires
    /// and is read through again.
    pub async fn update_profile(&self, current: &User, update: &ProfileUpdate) -> Result<User> {
        if update.is_empty() {
            return self
                .lookup_by_email(&current.email)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", current.id)));
        }

        let new_username = update
            .username
            .as_deref()
            .filter(|name| current.username_key() != Some(*name));

        // Uniqueness is checked against the source of truth, not the cache.
        if let Some(username) = new_username {
            if let Some(owner) = self.users.find_user(UserFilter::Username(username)).await? {
                if owner.id != current.id {
                    return Err(AppError::Conflict("Username already taken".to_string()));
                }
            }
        }

        let matched = self.users.update_user(&current.id, update).await?;
        if matched == 0 {
            return Err(AppError::NotFound(format!("User {} not found", current.id)));
        }

        let mut merged = current.clone();
        update.apply_to(&mut merged);
        self.cache_user(&merged).await;

        if new_username.is_some() {
            if let Some(old) = current.username_key() {
                self.evict(&keys::user_by_username(old)).await;
            }
        }

        tracing::info!(
            user_id = %current.id,
            fields = ?update.changed_fields(),
            "Profile updated"
        );
        Ok(merged)
    }

    async fn read_cached(&self, cache_key: &str, kind: &'static str) -> Option<User> {
        let raw = match self.cache.get(cache_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(kind, error = %e, "Cache read failed, using document store");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(kind, error = %e, "Discarding undecodable cached user");
                None
            }
        }
    }

    async fn write_key(&self, cache_key: &str, encoded: &str) {
        if let Err(e) = self.cache.set(cache_key, encoded, self.ttl_secs).await {
            tracing::warn!(error = %e, "Cache write failed");
        }
    }

    async fn evict(&self, cache_key: &str) {
        if let Err(e) = self.cache.delete(cache_key).await {
            tracing::warn!(error = %e, "Cache delete failed");
        }
    }
}

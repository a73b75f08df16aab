// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Examtie core: user identity cache and daily streaks
//!
//! This crate provides the backend API for profile lookups served through a
//! read-through cache, and for per-user consecutive-day activity streaks.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use cache::KeyValueStore;
use config::Config;
use db::UserStore;
use services::{IdentityCache, StreakEngine};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub identity: IdentityCache,
    pub streaks: StreakEngine,
}

impl AppState {
    /// Wire the services to injected store clients using the TTLs in `config`.
    pub fn new(config: Config, users: Arc<dyn UserStore>, cache: Arc<dyn KeyValueStore>) -> Self {
        let identity = IdentityCache::new(users.clone(), cache.clone(), config.cache_expire_seconds);
        let streaks = StreakEngine::new(cache, config.streak_ttl_seconds);

        Self {
            config,
            users,
            identity,
            streaks,
        }
    }
}

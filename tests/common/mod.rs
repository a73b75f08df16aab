// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use examtie_core::cache::{CacheError, KeyValueStore, MemoryStore};
use examtie_core::config::Config;
use examtie_core::db::{UserFilter, UserStore};
use examtie_core::error::AppError;
use examtie_core::middleware::auth::create_jwt;
use examtie_core::models::{ProfileUpdate, Role, User};
use examtie_core::routes::create_router;
use examtie_core::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Redis URL for integration tests, if one is configured.
#[allow(dead_code)]
pub fn redis_url() -> Option<String> {
    std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty())
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Skip test with message if no Redis server is configured.
#[macro_export]
macro_rules! require_redis {
    () => {
        match crate::common::redis_url() {
            Some(url) => url,
            None => {
                eprintln!("⚠️  Skipping: REDIS_URL not set");
                return;
            }
        }
    };
}

/// Unique suffix for test isolation against shared backends.
#[allow(dead_code)]
pub fn unique_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string()
}

/// Helper to create a basic test user.
#[allow(dead_code)]
pub fn test_user(id: &str, email: &str, username: Option<&str>) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        username: username.map(str::to_string),
        full_name: "Test User".to_string(),
        bio: String::new(),
        profile_image: String::new(),
        roles: vec![Role::User],
        hashed_password: "$2b$12$notarealhash".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
        updated_at: None,
        last_active: None,
    }
}

/// In-memory document store that counts calls and can be told to fail.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
    find_calls: AtomicUsize,
    update_calls: AtomicUsize,
    touch_calls: AtomicUsize,
    fail_all: AtomicBool,
}

#[allow(dead_code)]
impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        for user in users {
            store.insert(user);
        }
        store
    }

    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn get(&self, id: &str) -> Option<User> {
        self.users.lock().unwrap().get(id).cloned()
    }

    pub fn remove(&self, id: &str) {
        self.users.lock().unwrap().remove(id);
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn touch_calls(&self) -> usize {
        self.touch_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with a database error.
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user(&self, filter: UserFilter<'_>) -> Result<Option<User>, AppError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        let users = self.users.lock().unwrap();
        let found = users.values().find(|u| match filter {
            UserFilter::Id(id) => u.id == id,
            UserFilter::Email(email) => u.email == email,
            UserFilter::Username(name) => u.username.as_deref() == Some(name),
        });
        Ok(found.cloned())
    }

    async fn update_user(&self, id: &str, update: &ProfileUpdate) -> Result<u64, AppError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(id) else {
            return Ok(0);
        };
        update.apply_to(user);
        user.updated_at = Some(Utc::now());
        Ok(1)
    }

    async fn touch_last_active(&self, id: &str, at: DateTime<Utc>) -> Result<u64, AppError> {
        self.touch_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(id) else {
            return Ok(0);
        };
        user.last_active = Some(at);
        Ok(1)
    }
}

/// Key-value store where every operation fails as if the server were down.
#[allow(dead_code)]
#[derive(Default)]
pub struct FailingCache {
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FailingCache {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Connection("connection refused".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), CacheError> {
        self.fail()
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        self.fail()
    }

    async fn hash_get_all(&self, _key: &str) -> Result<HashMap<String, String>, CacheError> {
        self.fail()
    }

    async fn hash_set(&self, _key: &str, _mapping: &[(String, String)]) -> Result<(), CacheError> {
        self.fail()
    }

    async fn expire(&self, _key: &str, _ttl_secs: u64) -> Result<bool, CacheError> {
        self.fail()
    }

    async fn hash_compare_and_set(
        &self,
        _key: &str,
        _version_field: &str,
        _expected: Option<&str>,
        _mapping: &[(String, String)],
        _ttl_secs: u64,
    ) -> Result<bool, CacheError> {
        self.fail()
    }
}

/// Handles to the fakes behind a test app.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub users: Arc<MemoryUserStore>,
    pub cache: MemoryStore,
}

/// Create a test app backed by in-memory stores, seeded with `ann` and `bob`.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let users = Arc::new(MemoryUserStore::with_users([
        test_user("u-ann", "ann@example.com", Some("ann")),
        test_user("u-bob", "bob@example.com", Some("bob")),
    ]));
    let cache = MemoryStore::new();

    let state = Arc::new(AppState::new(config, users.clone(), Arc::new(cache.clone())));

    TestApp {
        router: create_router(state.clone()),
        state,
        users,
        cache,
    }
}

/// Create a session JWT signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(email: &str) -> String {
    create_jwt(email, &[Role::User], &Config::test_default().jwt_signing_key).unwrap()
}

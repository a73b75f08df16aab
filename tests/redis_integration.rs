// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Redis integration tests.
//!
//! These tests require a Redis server. Set REDIS_URL (for example
//! `redis://127.0.0.1:6379`) to run them; otherwise they are skipped.
//! Keys are suffixed per run so a shared server can be reused.

use chrono::{NaiveDate, TimeDelta};
use examtie_core::cache::{keys, KeyValueStore, RedisStore};
use examtie_core::models::StreakInfo;
use examtie_core::services::StreakEngine;
use std::sync::Arc;

mod common;
use common::unique_suffix;

async fn store(url: &str) -> RedisStore {
    RedisStore::connect(url)
        .await
        .expect("Failed to connect to Redis")
}

#[tokio::test]
async fn test_string_set_get_delete() {
    let url = require_redis!();
    let store = store(&url).await;
    let key = format!("test:str:{}", unique_suffix());

    assert_eq!(store.get(&key).await.unwrap(), None);

    store.set(&key, "hello", 60).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("hello"));

    assert!(store.delete(&key).await.unwrap());
    assert!(!store.delete(&key).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_hash_set_and_expire() {
    let url = require_redis!();
    let store = store(&url).await;
    let key = format!("test:hash:{}", unique_suffix());

    assert!(store.hash_get_all(&key).await.unwrap().is_empty());
    assert!(!store.expire(&key, 60).await.unwrap());

    store
        .hash_set(&key, &[("a".to_string(), "1".to_string())])
        .await
        .unwrap();
    store
        .hash_set(&key, &[("b".to_string(), "2".to_string())])
        .await
        .unwrap();
    assert!(store.expire(&key, 60).await.unwrap());

    let fields = store.hash_get_all(&key).await.unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields.get("a").map(String::as_str), Some("1"));

    store.delete(&key).await.unwrap();
}

#[tokio::test]
async fn test_wrong_type_is_command_error() {
    let url = require_redis!();
    let store = store(&url).await;
    let key = format!("test:wrongtype:{}", unique_suffix());

    store.set(&key, "plain", 60).await.unwrap();
    let err = store.hash_get_all(&key).await.unwrap_err();
    assert!(err.to_string().contains("WRONGTYPE"), "{}", err);

    store.delete(&key).await.unwrap();
}

#[tokio::test]
async fn test_compare_and_set() {
    let url = require_redis!();
    let store = store(&url).await;
    let key = format!("test:cas:{}", unique_suffix());
    let write = |v: &str| vec![("version".to_string(), v.to_string())];

    // Missing hash only matches "no version".
    assert!(!store
        .hash_compare_and_set(&key, "version", Some("1"), &write("2"), 60)
        .await
        .unwrap());
    assert!(store
        .hash_compare_and_set(&key, "version", None, &write("1"), 60)
        .await
        .unwrap());

    // Stale expectations lose.
    assert!(!store
        .hash_compare_and_set(&key, "version", None, &write("9"), 60)
        .await
        .unwrap());
    assert!(!store
        .hash_compare_and_set(&key, "version", Some("0"), &write("9"), 60)
        .await
        .unwrap());
    assert!(store
        .hash_compare_and_set(&key, "version", Some("1"), &write("2"), 60)
        .await
        .unwrap());

    let fields = store.hash_get_all(&key).await.unwrap();
    assert_eq!(fields.get("version").map(String::as_str), Some("2"));

    store.delete(&key).await.unwrap();
}

#[tokio::test]
async fn test_streak_engine_over_redis() {
    let url = require_redis!();
    let store = Arc::new(store(&url).await);
    let engine = StreakEngine::new(store.clone(), 600);
    let user_id = format!("test-user-{}", unique_suffix());
    let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    engine.record_activity(&user_id, d).await.unwrap();
    engine.record_activity(&user_id, d).await.unwrap();
    engine
        .record_activity(&user_id, d + TimeDelta::days(1))
        .await
        .unwrap();
    let streak = engine
        .record_activity(&user_id, d + TimeDelta::days(3))
        .await
        .unwrap();

    assert_eq!(
        streak,
        StreakInfo {
            current: 3,
            revives_used: 1
        }
    );
    assert_eq!(engine.get_streak(&user_id).await.unwrap(), streak);

    store.delete(&keys::streak(&user_id)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_streak_updates_over_redis() {
    let url = require_redis!();
    let store = Arc::new(store(&url).await);
    let engine = StreakEngine::new(store.clone(), 600);
    let user_id = format!("test-user-{}", unique_suffix());
    let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = engine.clone();
            let user_id = user_id.clone();
            tokio::spawn(async move { engine.record_activity(&user_id, d).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().current, 1);
    }

    store.delete(&keys::streak(&user_id)).await.unwrap();
}

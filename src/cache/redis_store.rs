// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Redis-backed key-value store.

use super::{CacheError, KeyValueStore};
use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, RedisError, Script};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Compare the version field, then write the mapping and refresh the TTL.
///
/// KEYS[1] = hash key
/// ARGV[1] = version field, ARGV[2] = "1" if a version is expected,
/// ARGV[3] = expected version, ARGV[4] = ttl seconds, ARGV[5..] = field/value pairs
const COMPARE_AND_SET_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], ARGV[1])
if ARGV[2] == '1' then
  if current ~= ARGV[3] then return 0 end
elseif current then
  return 0
end
for i = 5, #ARGV, 2 do
  redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
end
redis.call('EXPIRE', KEYS[1], ARGV[4])
return 1
"#;

/// Redis client wrapper.
///
/// `ConnectionManager` reconnects on its own and is cheap to clone, so every
/// command runs on a clone of the shared handle.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    cas_script: Arc<Script>,
}

impl RedisStore {
    /// Open a managed connection to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = ::redis::Client::open(url)
            .map_err(|e| CacheError::Connection(format!("Invalid Redis URL: {}", e)))?;

        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!("Connected to Redis");

        Ok(Self {
            conn,
            cas_script: Arc::new(Script::new(COMPARE_AND_SET_SCRIPT)),
        })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

fn command_error(e: RedisError) -> CacheError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
        CacheError::Connection(e.to_string())
    } else {
        CacheError::Command(e.to_string())
    }
}

fn ttl_arg(ttl_secs: u64) -> i64 {
    i64::try_from(ttl_secs).unwrap_or(i64::MAX)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.conn()
            .get::<_, Option<String>>(key)
            .await
            .map_err(command_error)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let _: () = self
            .conn()
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed: i64 = self.conn().del(key).await.map_err(command_error)?;
        Ok(removed > 0)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        self.conn()
            .hgetall::<_, HashMap<String, String>>(key)
            .await
            .map_err(command_error)
    }

    async fn hash_set(&self, key: &str, mapping: &[(String, String)]) -> Result<(), CacheError> {
        if mapping.is_empty() {
            return Ok(());
        }
        let _: () = self
            .conn()
            .hset_multiple(key, mapping)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, CacheError> {
        self.conn()
            .expire::<_, bool>(key, ttl_arg(ttl_secs))
            .await
            .map_err(command_error)
    }

    async fn hash_compare_and_set(
        &self,
        key: &str,
        version_field: &str,
        expected: Option<&str>,
        mapping: &[(String, String)],
        ttl_secs: u64,
    ) -> Result<bool, CacheError> {
        let mut invocation = self.cas_script.key(key);
        invocation
            .arg(version_field)
            .arg(if expected.is_some() { "1" } else { "0" })
            .arg(expected.unwrap_or(""))
            .arg(ttl_arg(ttl_secs));
        for (field, value) in mapping {
            invocation.arg(field).arg(value);
        }

        let mut conn = self.conn();
        let written: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(written == 1)
    }
}

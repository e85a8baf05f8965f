//! Shared cache backend over an external store, for deployments where
//! several service replicas need to see one another's cached entries.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use redis::AsyncCommands;
use wayfare_core::CoreError;

use crate::glob::glob_match;
use crate::{not_found, CacheStats};

use super::CacheBackend;

fn backend_error(err: redis::RedisError) -> CoreError {
    CoreError::new(wayfare_core::ErrorCode::Internal, format!("cache backend error: {err}"))
}

/// Redis-backed cache. Hit/miss counters are tracked locally per replica
/// (the store itself has no notion of them); `deleteByPattern` enumerates
/// with `KEYS` then issues one batched `DEL`, so it is advisory under
/// concurrent writers, per §4.7.
#[derive(Clone)]
pub struct SharedBackend {
    manager: redis::aio::ConnectionManager,
    hits: std::sync::Arc<AtomicU64>,
    misses: std::sync::Arc<AtomicU64>,
}

impl SharedBackend {
    pub async fn connect(addr: &str) -> Result<Self, CoreError> {
        let client = redis::Client::open(addr).map_err(backend_error)?;
        let manager = client.get_connection_manager().await.map_err(backend_error)?;
        Ok(Self { manager, hits: Default::default(), misses: Default::default() })
    }
}

impl CacheBackend for SharedBackend {
    async fn get(&self, key: &str) -> Result<Bytes, CoreError> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(backend_error)?;
        match value {
            Some(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Bytes::from(bytes))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err(not_found(key))
            }
        }
    }

    async fn get_with_ttl(&self, key: &str) -> Result<(Bytes, Duration), CoreError> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(backend_error)?;
        let Some(bytes) = value else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Err(not_found(key));
        };
        let ttl_secs: i64 = conn.ttl(key).await.map_err(backend_error)?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok((Bytes::from(bytes), Duration::from_secs(ttl_secs.max(0) as u64)))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CoreError> {
        let mut conn = self.manager.clone();
        let _: () = conn.set_ex(key, value.to_vec(), ttl.as_secs().max(1)).await.map_err(backend_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await.map_err(backend_error)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CoreError> {
        let mut conn = self.manager.clone();
        let exists: bool = conn.exists(key).await.map_err(backend_error)?;
        Ok(exists)
    }

    async fn mget(&self, keys: &[String]) -> Result<BTreeMap<String, Bytes>, CoreError> {
        if keys.is_empty() {
            return Ok(BTreeMap::new());
        }
        let mut conn = self.manager.clone();
        let values: Vec<Option<Vec<u8>>> = conn.get(keys).await.map_err(backend_error)?;
        let mut out = BTreeMap::new();
        for (key, value) in keys.iter().zip(values) {
            match value {
                Some(bytes) => {
                    out.insert(key.clone(), Bytes::from(bytes));
                    self.hits.fetch_add(1, Ordering::Relaxed);
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        Ok(out)
    }

    async fn mset(&self, entries: &[(String, Bytes)], ttl: Duration) -> Result<(), CoreError> {
        let mut conn = self.manager.clone();
        for (key, value) in entries {
            let _: () = conn.set_ex(key, value.to_vec(), ttl.as_secs().max(1)).await.map_err(backend_error)?;
        }
        Ok(())
    }

    async fn mdelete(&self, keys: &[String]) -> Result<(), CoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        let _: () = conn.del(keys).await.map_err(backend_error)?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CoreError> {
        let mut conn = self.manager.clone();
        let all: Vec<String> = conn.keys("*").await.map_err(backend_error)?;
        Ok(all.into_iter().filter(|k| glob_match(pattern, k)).collect())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CoreError> {
        let matching = self.keys(pattern).await?;
        if matching.is_empty() {
            return Ok(0);
        }
        let count = matching.len() as u64;
        let mut conn = self.manager.clone();
        let _: () = conn.del(matching).await.map_err(backend_error)?;
        Ok(count)
    }

    async fn stats(&self) -> Result<CacheStats, CoreError> {
        let mut conn = self.manager.clone();
        let all: Vec<String> = conn.keys("*").await.map_err(backend_error)?;
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses == 0 { 0.0 } else { hits as f64 / (hits + misses) as f64 };
        Ok(CacheStats { hits, misses, key_count: all.len() as u64, memory_bytes: 0, hit_rate })
    }

    async fn clear(&self) -> Result<(), CoreError> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await.map_err(backend_error)?;
        Ok(())
    }
}

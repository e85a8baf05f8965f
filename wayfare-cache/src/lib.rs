//! Key/value cache with TTL, bulk operations, and pattern deletes, plus a
//! typed wrapper over compute results keyed by canonical graph hash, per
//! §4.7.
//!
//! [`Cache`] is the engine callers reach for: it composes a
//! [`backend::CacheBackend`] (in-process [`backend::memory::InMemoryBackend`]
//! or shared [`backend::shared::SharedBackend`]) with a default TTL.
//! [`solve::SolveCache`] layers a typed, graph-hash-keyed view on top for
//! cached flow-solve results.

pub mod backend;
mod glob;
pub mod solve;

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use wayfare_core::{CoreError, ErrorCode};

use backend::{CacheBackend, CacheBackendErased};

pub use solve::{CachedSolveResult, FlowEdgeRecord, SolveCache, SolveStatus};

/// Hit/miss counters, memory usage, and key count for a cache instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub key_count: u64,
    pub memory_bytes: u64,
    pub hit_rate: f64,
}

/// The dedicated not-found sentinel a missing key fails with.
pub fn not_found(key: &str) -> CoreError {
    CoreError::new(ErrorCode::NotFound, format!("cache key not found: {key}"))
}

/// The engine callers reach for. Construct with a backend and a default
/// TTL; `set` with a non-positive TTL substitutes the default.
#[derive(Clone)]
pub struct Cache {
    backend: std::sync::Arc<dyn CacheBackendErased>,
    default_ttl: Duration,
}

impl Cache {
    pub fn new<B: CacheBackend>(backend: B, default_ttl: Duration) -> Self {
        Self { backend: std::sync::Arc::new(backend), default_ttl }
    }

    fn resolve_ttl(&self, ttl: Duration) -> Duration {
        if ttl.is_zero() {
            self.default_ttl
        } else {
            ttl
        }
    }

    pub async fn get(&self, key: &str) -> Result<Bytes, CoreError> {
        self.backend.get(key).await
    }

    /// On a missing key returns not-found and a zero TTL, per §8's boundary
    /// behavior — never an error for the caller to special-case.
    pub async fn get_with_ttl(&self, key: &str) -> Result<(Bytes, Duration), CoreError> {
        match self.backend.get_with_ttl(key).await {
            Ok(found) => Ok(found),
            Err(err) if err.is(ErrorCode::NotFound) => Ok((Bytes::new(), Duration::ZERO)),
            Err(err) => Err(err),
        }
    }

    pub async fn set(&self, key: &str, value: impl Into<Bytes>, ttl: Duration) -> Result<(), CoreError> {
        self.backend.set(key, value.into(), self.resolve_ttl(ttl)).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.backend.delete(key).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CoreError> {
        self.backend.exists(key).await
    }

    /// Returns only the keys that were found.
    pub async fn mget(&self, keys: &[String]) -> Result<BTreeMap<String, Bytes>, CoreError> {
        self.backend.mget(keys).await
    }

    pub async fn mset(&self, entries: &[(String, Bytes)], ttl: Duration) -> Result<(), CoreError> {
        self.backend.mset(entries, self.resolve_ttl(ttl)).await
    }

    pub async fn mdelete(&self, keys: &[String]) -> Result<(), CoreError> {
        self.backend.mdelete(keys).await
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, CoreError> {
        self.backend.keys(pattern).await
    }

    pub async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CoreError> {
        self.backend.delete_by_pattern(pattern).await
    }

    pub async fn stats(&self) -> Result<CacheStats, CoreError> {
        self.backend.stats().await
    }

    pub async fn clear(&self) -> Result<(), CoreError> {
        self.backend.clear().await
    }

    pub async fn close(&self) -> Result<(), CoreError> {
        self.backend.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;

    #[tokio::test]
    async fn set_with_zero_ttl_uses_the_default() {
        let cache = Cache::new(InMemoryBackend::new(100), Duration::from_secs(30));
        cache.set("k", Bytes::from_static(b"v"), Duration::ZERO).await.unwrap();
        let (_, ttl) = cache.get_with_ttl("k").await.unwrap();
        assert!(ttl > Duration::ZERO && ttl <= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn get_with_ttl_on_missing_key_returns_zero_ttl() {
        let cache = Cache::new(InMemoryBackend::new(100), Duration::from_secs(30));
        let (value, ttl) = cache.get_with_ttl("missing").await.unwrap();
        assert!(value.is_empty());
        assert_eq!(ttl, Duration::ZERO);
    }

    #[tokio::test]
    async fn mget_returns_only_found_keys() {
        let cache = Cache::new(InMemoryBackend::new(100), Duration::from_secs(30));
        cache.set("a", Bytes::from_static(b"1"), Duration::from_secs(30)).await.unwrap();
        let found = cache.mget(&["a".to_string(), "b".to_string()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("a"));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let cache = Cache::new(InMemoryBackend::new(100), Duration::from_secs(30));
        cache.close().await.unwrap();
        cache.close().await.unwrap();
    }
}

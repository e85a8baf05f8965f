//! The [`CacheBackend`] capability every storage driver implements, plus an
//! object-safe erased twin so [`crate::Cache`] can hold `Arc<dyn ...>`
//! regardless of which backend was constructed — the same shape as
//! `wayfare_rate_limit::backend::RateLimitBackendErased`.

pub mod memory;
pub mod shared;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use wayfare_core::CoreError;

use crate::CacheStats;

/// Storage driver behind [`crate::Cache`]. `key`/`pattern` are plain UTF-8
/// strings using the project's colon-namespaced convention (e.g.
/// `solve:<algorithm>:<graph-hash>`).
pub trait CacheBackend: Send + Sync + 'static {
    fn get(&self, key: &str) -> impl Future<Output = Result<Bytes, CoreError>> + Send;

    fn get_with_ttl(&self, key: &str) -> impl Future<Output = Result<(Bytes, Duration), CoreError>> + Send;

    fn set(&self, key: &str, value: Bytes, ttl: Duration) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, CoreError>> + Send;

    fn mget(&self, keys: &[String]) -> impl Future<Output = Result<BTreeMap<String, Bytes>, CoreError>> + Send;

    fn mset(&self, entries: &[(String, Bytes)], ttl: Duration) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn mdelete(&self, keys: &[String]) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn keys(&self, pattern: &str) -> impl Future<Output = Result<Vec<String>, CoreError>> + Send;

    /// Enumerates matching keys then deletes them in one batch. Advisory: a
    /// concurrent insert matching `pattern` may land after the enumeration
    /// and survive. Returns the number of keys deleted.
    fn delete_by_pattern(&self, pattern: &str) -> impl Future<Output = Result<u64, CoreError>> + Send;

    fn stats(&self) -> impl Future<Output = Result<CacheStats, CoreError>> + Send;

    fn clear(&self) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn close(&self) -> impl Future<Output = Result<(), CoreError>> + Send {
        async { Ok(()) }
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[doc(hidden)]
pub(crate) trait CacheBackendErased: Send + Sync + 'static {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Bytes, CoreError>>;
    fn get_with_ttl<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(Bytes, Duration), CoreError>>;
    fn set<'a>(&'a self, key: &'a str, value: Bytes, ttl: Duration) -> BoxFuture<'a, Result<(), CoreError>>;
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CoreError>>;
    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, CoreError>>;
    fn mget<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<BTreeMap<String, Bytes>, CoreError>>;
    fn mset<'a>(&'a self, entries: &'a [(String, Bytes)], ttl: Duration) -> BoxFuture<'a, Result<(), CoreError>>;
    fn mdelete<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<(), CoreError>>;
    fn keys<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<Vec<String>, CoreError>>;
    fn delete_by_pattern<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<u64, CoreError>>;
    fn stats(&self) -> BoxFuture<'_, Result<CacheStats, CoreError>>;
    fn clear(&self) -> BoxFuture<'_, Result<(), CoreError>>;
    fn close(&self) -> BoxFuture<'_, Result<(), CoreError>>;
}

impl<T: CacheBackend> CacheBackendErased for T {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Bytes, CoreError>> {
        Box::pin(CacheBackend::get(self, key))
    }

    fn get_with_ttl<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(Bytes, Duration), CoreError>> {
        Box::pin(CacheBackend::get_with_ttl(self, key))
    }

    fn set<'a>(&'a self, key: &'a str, value: Bytes, ttl: Duration) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(CacheBackend::set(self, key, value, ttl))
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(CacheBackend::delete(self, key))
    }

    fn exists<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, CoreError>> {
        Box::pin(CacheBackend::exists(self, key))
    }

    fn mget<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<BTreeMap<String, Bytes>, CoreError>> {
        Box::pin(CacheBackend::mget(self, keys))
    }

    fn mset<'a>(&'a self, entries: &'a [(String, Bytes)], ttl: Duration) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(CacheBackend::mset(self, entries, ttl))
    }

    fn mdelete<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(CacheBackend::mdelete(self, keys))
    }

    fn keys<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<Vec<String>, CoreError>> {
        Box::pin(CacheBackend::keys(self, pattern))
    }

    fn delete_by_pattern<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<u64, CoreError>> {
        Box::pin(CacheBackend::delete_by_pattern(self, pattern))
    }

    fn stats(&self) -> BoxFuture<'_, Result<CacheStats, CoreError>> {
        Box::pin(CacheBackend::stats(self))
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), CoreError>> {
        Box::pin(CacheBackend::clear(self))
    }

    fn close(&self) -> BoxFuture<'_, Result<(), CoreError>> {
        Box::pin(CacheBackend::close(self))
    }
}

//! In-process cache backend: a map of keys to byte payloads with a size
//! budget, approximate LRU eviction, and a background sweep of expired
//! entries — the in-process half of §4.7's "two backends" contract.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wayfare_core::CoreError;

use crate::glob::glob_match;
use crate::{not_found, CacheStats};

use super::CacheBackend;

struct Entry {
    value: Bytes,
    ttl: Duration,
    expires_at: Instant,
    last_used: Instant,
}

impl Entry {
    fn new(value: Bytes, ttl: Duration) -> Self {
        let now = Instant::now();
        Self { value, ttl, expires_at: now + ttl, last_used: now }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process backend bounded by `max_entries`. When an insert would exceed
/// the budget, the least-recently-used entry is evicted first — found by a
/// linear scan, which is adequate at the entry counts this backend is sized
/// for (thousands, not millions).
pub struct InMemoryBackend {
    entries: Arc<DashMap<String, Entry>>,
    max_entries: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    cleanup: std::sync::Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl InMemoryBackend {
    pub fn new(max_entries: u64) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            cleanup: std::sync::Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Starts the background sweep of expired entries, running every
    /// `interval`.
    pub fn spawn_cleanup(&self, interval: Duration) {
        let entries = self.entries.clone();
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let now = Instant::now();
                        entries.retain(|_, entry| !entry.is_expired(now));
                    }
                }
            }
        });
        *self.cleanup.lock().expect("cache cleanup mutex poisoned") = Some(handle);
    }

    fn evict_one_if_over_budget(&self) {
        if self.max_entries == 0 || (self.entries.len() as u64) <= self.max_entries {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.last_used)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Bytes, CoreError> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.last_used = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(entry.value.clone())
            }
            Some(_) => {
                drop(self.entries.remove(key));
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err(not_found(key))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err(not_found(key))
            }
        }
    }

    async fn get_with_ttl(&self, key: &str) -> Result<(Bytes, Duration), CoreError> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.last_used = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                let remaining = entry.expires_at.saturating_duration_since(now);
                Ok((entry.value.clone(), remaining))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err(not_found(key))
            }
        }
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CoreError> {
        self.entries.insert(key.to_string(), Entry::new(value, ttl));
        self.evict_one_if_over_budget();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CoreError> {
        let now = Instant::now();
        Ok(self.entries.get(key).map(|e| !e.is_expired(now)).unwrap_or(false))
    }

    async fn mget(&self, keys: &[String]) -> Result<BTreeMap<String, Bytes>, CoreError> {
        let now = Instant::now();
        let mut out = BTreeMap::new();
        for key in keys {
            if let Some(mut entry) = self.entries.get_mut(key) {
                if !entry.is_expired(now) {
                    entry.last_used = now;
                    out.insert(key.clone(), entry.value.clone());
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(out)
    }

    async fn mset(&self, entries: &[(String, Bytes)], ttl: Duration) -> Result<(), CoreError> {
        for (key, value) in entries {
            self.entries.insert(key.clone(), Entry::new(value.clone(), ttl));
        }
        for _ in 0..entries.len() {
            self.evict_one_if_over_budget();
        }
        Ok(())
    }

    async fn mdelete(&self, keys: &[String]) -> Result<(), CoreError> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|entry| !entry.is_expired(now) && glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CoreError> {
        let matching = self.keys(pattern).await?;
        let count = matching.len() as u64;
        for key in matching {
            self.entries.remove(&key);
        }
        Ok(count)
    }

    async fn stats(&self) -> Result<CacheStats, CoreError> {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let memory_bytes: u64 = self.entries.iter().map(|e| e.value.len() as u64).sum();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses == 0 { 0.0 } else { hits as f64 / (hits + misses) as f64 };
        Ok(CacheStats { hits, misses, key_count: self.entries.len() as u64, memory_bytes, hit_rate })
    }

    async fn clear(&self) -> Result<(), CoreError> {
        self.entries.clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), CoreError> {
        self.shutdown.cancel();
        if let Some(handle) = self.cleanup.lock().expect("cache cleanup mutex poisoned").take() {
            let _ = handle.await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let backend = InMemoryBackend::new(100);
        backend.set("k", Bytes::from_static(b"v"), Duration::from_secs(60)).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Bytes::from_static(b"v"));
    }

    #[tokio::test]
    async fn get_on_missing_key_is_not_found() {
        let backend = InMemoryBackend::new(100);
        let err = backend.get("missing").await.unwrap_err();
        assert!(err.is(wayfare_core::ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn entry_expires_after_its_ttl() {
        let backend = InMemoryBackend::new(100);
        backend.set("k", Bytes::from_static(b"v"), Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(backend.get("k").await.is_err());
    }

    #[tokio::test]
    async fn eviction_keeps_the_map_within_budget() {
        let backend = InMemoryBackend::new(2);
        backend.set("a", Bytes::from_static(b"1"), Duration::from_secs(60)).await.unwrap();
        backend.set("b", Bytes::from_static(b"2"), Duration::from_secs(60)).await.unwrap();
        backend.set("c", Bytes::from_static(b"3"), Duration::from_secs(60)).await.unwrap();
        let stats = backend.stats().await.unwrap();
        assert!(stats.key_count <= 2);
    }

    #[tokio::test]
    async fn delete_by_pattern_removes_all_matches() {
        let backend = InMemoryBackend::new(100);
        backend.set("solve:dinic:a", Bytes::from_static(b"1"), Duration::from_secs(60)).await.unwrap();
        backend.set("solve:bfs:b", Bytes::from_static(b"2"), Duration::from_secs(60)).await.unwrap();
        backend.set("other:c", Bytes::from_static(b"3"), Duration::from_secs(60)).await.unwrap();
        let deleted = backend.delete_by_pattern("solve:*").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(backend.exists("other:c").await.unwrap());
    }

    #[tokio::test]
    async fn stats_hit_rate_reflects_hits_and_misses() {
        let backend = InMemoryBackend::new(100);
        backend.set("k", Bytes::from_static(b"v"), Duration::from_secs(60)).await.unwrap();
        backend.get("k").await.unwrap();
        backend.get("missing").await.unwrap_err();
        let stats = backend.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }
}

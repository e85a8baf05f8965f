//! In-process rate-limit backend: a map of keys to buckets, with a
//! background janitor sweeping entries that have gone quiet.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wayfare_core::CoreError;

use crate::strategy::{Admission, RateLimitParams, SlidingWindowBucket, Strategy, TokenBucketState};
use crate::LimitInfo;

use super::RateLimitBackend;

enum Bucket {
    Sliding(SlidingWindowBucket),
    Token(TokenBucketState),
}

impl Bucket {
    fn new(now: Instant, params: RateLimitParams) -> Self {
        match params.strategy {
            Strategy::SlidingWindow => Bucket::Sliding(SlidingWindowBucket::default()),
            Strategy::TokenBucket => Bucket::Token(TokenBucketState::new(now, (params.requests + params.burst) as f64)),
        }
    }

    fn last_activity(&self) -> Option<Instant> {
        match self {
            Bucket::Sliding(b) => b.last_activity,
            Bucket::Token(b) => b.last_activity,
        }
    }

    fn allow_n(&mut self, now: Instant, params: RateLimitParams, n: u64) -> Admission {
        match self {
            Bucket::Sliding(b) => b.allow_n(now, params.requests, params.window, n),
            Bucket::Token(b) => b.allow_n(now, params.requests, params.window, params.burst, n),
        }
    }

    fn reset(&mut self, now: Instant, params: RateLimitParams) {
        match self {
            Bucket::Sliding(b) => b.reset(),
            Bucket::Token(b) => b.reset(now, params.requests),
        }
    }

    fn remaining(&mut self, now: Instant, params: RateLimitParams) -> u64 {
        match self {
            Bucket::Sliding(b) => b.remaining(now, params.requests, params.window),
            Bucket::Token(b) => b.remaining(now, params.requests, params.window, params.burst),
        }
    }
}

/// In-process backend. Each key's bucket is guarded independently (via
/// `DashMap`'s sharded locking) so `allow`/`allow_n` are linearizable per
/// key while different keys proceed concurrently, per §5. A background
/// janitor removes buckets idle for longer than `2 * window`.
pub struct InMemoryBackend {
    buckets: Arc<DashMap<String, Bucket>>,
    janitor: std::sync::Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self { buckets: Arc::new(DashMap::new()), janitor: std::sync::Mutex::new(None), shutdown: CancellationToken::new() }
    }

    /// Start the background janitor, sweeping every `cleanup_interval`.
    /// Buckets whose last activity is older than `2 * window` are dropped.
    pub fn spawn_janitor(&self, cleanup_interval: Duration, window: Duration) {
        let buckets = self.buckets.clone();
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup_interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let now = Instant::now();
                        let stale = window.saturating_mul(2);
                        buckets.retain(|_, bucket| {
                            bucket.last_activity().map(|t| now.duration_since(t) < stale).unwrap_or(true)
                        });
                    }
                }
            }
        });
        *self.janitor.lock().expect("janitor mutex poisoned") = Some(handle);
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitBackend for InMemoryBackend {
    async fn allow_n(&self, key: &str, params: RateLimitParams, n: u64) -> Result<Admission, CoreError> {
        let now = Instant::now();
        let mut entry = self.buckets.entry(key.to_string()).or_insert_with(|| Bucket::new(now, params));
        Ok(entry.value_mut().allow_n(now, params, n))
    }

    async fn reset(&self, key: &str, params: RateLimitParams) -> Result<(), CoreError> {
        let now = Instant::now();
        let mut entry = self.buckets.entry(key.to_string()).or_insert_with(|| Bucket::new(now, params));
        entry.value_mut().reset(now, params);
        Ok(())
    }

    async fn get_info(&self, key: &str, params: RateLimitParams) -> Result<LimitInfo, CoreError> {
        let now = Instant::now();
        let remaining = match self.buckets.get_mut(key) {
            Some(mut entry) => entry.value_mut().remaining(now, params),
            None => params.requests,
        };
        Ok(LimitInfo::from_remaining(params.requests, remaining, params.window))
    }

    async fn close(&self) -> Result<(), CoreError> {
        self.shutdown.cancel();
        if let Some(handle) = self.janitor.lock().expect("janitor mutex poisoned").take() {
            let _ = handle.await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;

    fn params(strategy: Strategy) -> RateLimitParams {
        RateLimitParams { strategy, requests: 5, window: Duration::from_secs(1), burst: 2 }
    }

    #[tokio::test]
    async fn sliding_window_denies_past_the_limit() {
        let backend = InMemoryBackend::new();
        let p = params(Strategy::SlidingWindow);
        for _ in 0..5 {
            assert!(backend.allow_n("k1", p, 1).await.unwrap().allowed);
        }
        assert!(!backend.allow_n("k1", p, 1).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn reset_restores_full_remaining() {
        let backend = InMemoryBackend::new();
        let p = params(Strategy::SlidingWindow);
        for _ in 0..5 {
            backend.allow_n("k1", p, 1).await.unwrap();
        }
        backend.reset("k1", p).await.unwrap();
        let info = backend.get_info("k1", p).await.unwrap();
        assert_eq!(info.remaining, 5);
    }

    #[tokio::test]
    async fn token_bucket_allows_burst_capacity() {
        let backend = InMemoryBackend::new();
        let p = params(Strategy::TokenBucket);
        for _ in 0..7 {
            assert!(backend.allow_n("k2", p, 1).await.unwrap().allowed);
        }
        assert!(!backend.allow_n("k2", p, 1).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn independent_keys_do_not_share_state() {
        let backend = InMemoryBackend::new();
        let p = params(Strategy::SlidingWindow);
        for _ in 0..5 {
            assert!(backend.allow_n("a", p, 1).await.unwrap().allowed);
        }
        assert!(backend.allow_n("b", p, 1).await.unwrap().allowed);
    }
}

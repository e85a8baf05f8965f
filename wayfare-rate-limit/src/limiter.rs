//! The engine callers actually reach for: [`RateLimiter`], composed from a
//! [`crate::backend::RateLimitBackend`], a strategy/requests/window/burst
//! envelope, and a configurable key extractor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use wayfare_core::{CoreError, ErrorCode};

use crate::backend::{RateLimitBackend, RateLimitBackendErased};
use crate::key::{ip_extractor, KeyExtractor, RequestMeta};
use crate::strategy::{RateLimitParams, Strategy};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Point-in-time admission state returned to denial responses and to
/// `getInfo` callers.
#[derive(Debug, Clone)]
pub struct LimitInfo {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
    pub retry_after: Option<Duration>,
}

impl LimitInfo {
    pub(crate) fn from_remaining(limit: u64, remaining: u64, window: Duration) -> Self {
        Self { limit, remaining, reset_at: Utc::now() + chrono::Duration::from_std(window).unwrap_or_default(), retry_after: None }
    }

    /// `limit`/`remaining=0`/`reset=<RFC3339>` response headers, per §4.6.5.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("limit", self.limit.to_string()),
            ("remaining", self.remaining.to_string()),
            ("reset", self.reset_at.to_rfc3339()),
        ]
    }
}

/// Returned by [`RateLimiter::check`] when a call is denied. Carries the
/// admission state so the caller (typically the rate-limit interceptor)
/// can attach `LimitInfo`/headers to the denial response.
#[derive(Debug, Clone)]
pub struct RateLimitDenied {
    pub info: LimitInfo,
}

impl std::fmt::Display for RateLimitDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rate limit exceeded: limit={} remaining={}", self.info.limit, self.info.remaining)
    }
}

impl std::error::Error for RateLimitDenied {}

/// Static configuration a [`RateLimiter`] enforces. One limiter instance
/// covers one limit/window/strategy combination; services that need
/// different limits per method compose several limiters (commonly keyed by
/// a [`crate::key::composite_extractor`] that folds the method name in).
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub strategy: Strategy,
    pub requests: u64,
    pub window: Duration,
    pub burst: u64,
}

impl RateLimiterConfig {
    fn params(&self) -> RateLimitParams {
        RateLimitParams { strategy: self.strategy, requests: self.requests, window: self.window, burst: self.burst }
    }
}

/// The admission engine. Construct with a backend ([`crate::backend::memory::InMemoryBackend`]
/// or [`crate::backend::shared::SharedBackend`]) and a [`RateLimiterConfig`].
///
/// On any backend error the engine fails open: the caller is admitted and
/// a warning is logged. This is an intentional availability bias per
/// §4.6.5 — a reimplementation may make it configurable, but the default
/// must stay fail-open.
#[derive(Clone)]
pub struct RateLimiter {
    backend: Arc<dyn RateLimitBackendErased>,
    config: RateLimiterConfig,
    key_extractor: KeyExtractor,
    closed: Arc<AtomicBool>,
}

impl RateLimiter {
    pub fn new<B: RateLimitBackend>(backend: B, config: RateLimiterConfig) -> Self {
        Self::from_erased(Arc::new(backend), config)
    }

    fn from_erased(backend: Arc<dyn RateLimitBackendErased>, config: RateLimiterConfig) -> Self {
        Self { backend, config, key_extractor: ip_extractor(), closed: Arc::new(AtomicBool::new(false)) }
    }

    pub fn with_key_extractor(mut self, extractor: KeyExtractor) -> Self {
        self.key_extractor = extractor;
        self
    }

    /// Derive the bucket key for an inbound call using the configured
    /// extractor. The rate-limit interceptor calls this once per request.
    pub fn extract_key(&self, meta: &RequestMeta) -> String {
        (self.key_extractor)(meta)
    }

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(CoreError::new(ErrorCode::Internal, "rate limiter closed"))
        } else {
            Ok(())
        }
    }

    /// `allow(ctx, key)` — single-slot admission check.
    pub async fn allow(&self, key: &str) -> Result<bool, CoreError> {
        self.allow_n(key, 1).await
    }

    /// `allowN(ctx, key, n)` — checks availability of `n` tokens/slots.
    /// Backend failures fail open (return `Ok(true)`) after logging a
    /// warning; they never propagate to the caller.
    pub async fn allow_n(&self, key: &str, n: u64) -> Result<bool, CoreError> {
        self.ensure_open()?;
        match self.backend.allow_n(key, self.config.params(), n).await {
            Ok(admission) => Ok(admission.allowed),
            Err(err) => {
                tracing::warn!(key, error = %err, "rate-limit backend failure; failing open");
                Ok(true)
            }
        }
    }

    /// Admission check that surfaces denial as a typed error carrying
    /// [`LimitInfo`], for interceptor use. Backend failures still fail
    /// open — a backend error never becomes a denial.
    pub async fn check(&self, key: &str) -> Result<(), RateLimitDenied> {
        let allowed = self.allow(key).await.unwrap_or(true);
        if allowed {
            return Ok(());
        }
        let info = self.get_info(key).await.unwrap_or_else(|_| LimitInfo {
            limit: self.config.requests,
            remaining: 0,
            reset_at: Utc::now() + chrono::Duration::from_std(self.config.window).unwrap_or_default(),
            retry_after: None,
        });
        Err(RateLimitDenied { info })
    }

    /// Polls at 100ms granularity until admitted or `cancel` fires.
    pub async fn wait(&self, key: &str, cancel: &CancellationToken) -> Result<(), CoreError> {
        loop {
            if self.allow(key).await? {
                return Ok(());
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(CoreError::new(ErrorCode::Timeout, "rate limiter wait cancelled"));
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    /// Clears the bucket for `key`, immediately restoring `remaining = requests`.
    pub async fn reset(&self, key: &str) -> Result<(), CoreError> {
        self.ensure_open()?;
        self.backend.reset(key, self.config.params()).await
    }

    pub async fn get_info(&self, key: &str) -> Result<LimitInfo, CoreError> {
        self.ensure_open()?;
        self.backend.get_info(key, self.config.params()).await
    }

    /// Releases backend resources. Idempotent: a second call returns
    /// quickly with no error.
    pub async fn close(&self) -> Result<(), CoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.backend.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;

    fn config(strategy: Strategy) -> RateLimiterConfig {
        RateLimiterConfig { strategy, requests: 5, window: Duration::from_secs(1), burst: 2 }
    }

    #[tokio::test]
    async fn sliding_window_saturation_scenario() {
        let limiter = RateLimiter::new(InMemoryBackend::new(), config(Strategy::SlidingWindow));
        for _ in 0..5 {
            assert!(limiter.allow("k1").await.unwrap());
        }
        assert!(!limiter.allow("k1").await.unwrap());
    }

    #[tokio::test]
    async fn reset_restores_remaining() {
        let limiter = RateLimiter::new(InMemoryBackend::new(), config(Strategy::SlidingWindow));
        for _ in 0..5 {
            limiter.allow("k1").await.unwrap();
        }
        limiter.reset("k1").await.unwrap();
        let info = limiter.get_info("k1").await.unwrap();
        assert_eq!(info.remaining, 5);
    }

    #[tokio::test]
    async fn check_returns_denied_with_limit_info() {
        let limiter = RateLimiter::new(InMemoryBackend::new(), config(Strategy::SlidingWindow));
        for _ in 0..5 {
            assert!(limiter.check("k1").await.is_ok());
        }
        let denied = limiter.check("k1").await.unwrap_err();
        assert_eq!(denied.info.limit, 5);
        assert_eq!(denied.info.remaining, 0);
        assert!(denied.info.headers().iter().any(|(k, _)| *k == "reset"));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_fails_fast_after() {
        let limiter = RateLimiter::new(InMemoryBackend::new(), config(Strategy::SlidingWindow));
        limiter.close().await.unwrap();
        limiter.close().await.unwrap();
        let err = limiter.allow("k1").await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn token_bucket_burst_scenario() {
        let limiter = RateLimiter::new(InMemoryBackend::new(), config(Strategy::TokenBucket));
        for _ in 0..7 {
            assert!(limiter.allow("k2").await.unwrap());
        }
        assert!(!limiter.allow("k2").await.unwrap());
    }
}

//! Bucket shapes for the two admission strategies. Both are private to
//! this crate — nothing outside `RateLimitBackend` implementations ever
//! sees a bucket directly.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Which admission algorithm a [`crate::RateLimiter`] enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    SlidingWindow,
    TokenBucket,
}

/// The parameters that define one key's admission envelope. Shared across
/// both strategies so a backend doesn't need a second parameter struct.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitParams {
    pub strategy: Strategy,
    pub requests: u64,
    pub window: Duration,
    pub burst: u64,
}

/// Outcome of one `allow_n` admission check.
#[derive(Debug, Clone, Copy)]
pub struct Admission {
    pub allowed: bool,
    pub remaining: u64,
    /// How long until at least one more slot/token becomes available.
    pub retry_after: Option<Duration>,
}

/// Sliding-window bucket: a sequence of accepted-event timestamps, all
/// within the last `window`. Invariant: stale entries are purged on every
/// read, never left to accumulate.
#[derive(Debug, Default)]
pub(crate) struct SlidingWindowBucket {
    pub(crate) events: VecDeque<Instant>,
    pub(crate) last_activity: Option<Instant>,
}

impl SlidingWindowBucket {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&front) = self.events.front() {
            if now.duration_since(front) >= window {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    pub(crate) fn allow_n(&mut self, now: Instant, requests: u64, window: Duration, n: u64) -> Admission {
        self.prune(now, window);
        self.last_activity = Some(now);
        let current = self.events.len() as u64;
        if current + n <= requests {
            for _ in 0..n {
                self.events.push_back(now);
            }
            Admission { allowed: true, remaining: requests - current - n, retry_after: None }
        } else {
            let retry_after = self.events.front().map(|&oldest| window.saturating_sub(now.duration_since(oldest)));
            Admission { allowed: false, remaining: requests.saturating_sub(current), retry_after }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.events.clear();
    }

    pub(crate) fn remaining(&mut self, now: Instant, requests: u64, window: Duration) -> u64 {
        self.prune(now, window);
        requests.saturating_sub(self.events.len() as u64)
    }
}

/// Token-bucket state: a fractional reservoir refilled at a constant rate,
/// capped at `requests + burst`.
#[derive(Debug)]
pub(crate) struct TokenBucketState {
    pub(crate) tokens: f64,
    pub(crate) last_refill: Instant,
    pub(crate) last_activity: Option<Instant>,
}

impl TokenBucketState {
    pub(crate) fn new(now: Instant, initial_tokens: f64) -> Self {
        Self { tokens: initial_tokens, last_refill: now, last_activity: Some(now) }
    }

    fn refill(&mut self, now: Instant, requests: u64, window: Duration, burst: u64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        let rate = requests as f64 / window.as_secs_f64().max(f64::MIN_POSITIVE);
        let cap = (requests + burst) as f64;
        self.tokens = (self.tokens + elapsed * rate).min(cap);
        self.last_refill = now;
    }

    pub(crate) fn allow_n(&mut self, now: Instant, requests: u64, window: Duration, burst: u64, n: u64) -> Admission {
        self.refill(now, requests, window, burst);
        self.last_activity = Some(now);
        let cost = n as f64;
        if self.tokens >= cost {
            self.tokens -= cost;
            Admission { allowed: true, remaining: self.tokens.floor() as u64, retry_after: None }
        } else {
            let rate = requests as f64 / window.as_secs_f64().max(f64::MIN_POSITIVE);
            let deficit = cost - self.tokens;
            let retry_after = if rate > 0.0 { Some(Duration::from_secs_f64(deficit / rate)) } else { None };
            Admission { allowed: false, remaining: self.tokens.floor() as u64, retry_after }
        }
    }

    pub(crate) fn reset(&mut self, now: Instant, requests: u64) {
        self.tokens = requests as f64;
        self.last_refill = now;
    }

    pub(crate) fn remaining(&mut self, now: Instant, requests: u64, window: Duration, burst: u64) -> u64 {
        self.refill(now, requests, window, burst);
        self.tokens.floor() as u64
    }
}

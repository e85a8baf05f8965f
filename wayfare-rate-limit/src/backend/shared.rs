//! Shared rate-limit backend over an external store. Sliding window is
//! implemented as a single atomic server-side script over a sorted set of
//! per-key event timestamps, per §4.6.3's "one round-trip" contract. Token
//! bucket is optional for shared backends and is not implemented here — a
//! request against this backend in token-bucket mode returns an error,
//! which [`crate::RateLimiter`] treats the same as any other backend
//! failure: fail open, log a warning.

use redis::AsyncCommands;
use wayfare_core::{CoreError, ErrorCode};

use crate::strategy::{Admission, RateLimitParams, Strategy};
use crate::LimitInfo;

use super::RateLimitBackend;

const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local limit = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local now_ms = tonumber(ARGV[3])
local n = tonumber(ARGV[4])

redis.call('ZREMRANGEBYSCORE', key, '-inf', now_ms - window_ms)
local count = redis.call('ZCARD', key)

if count + n <= limit then
    for i = 1, n do
        redis.call('ZADD', key, now_ms, now_ms .. '-' .. i .. '-' .. math.random(1, 1000000000))
    end
    redis.call('PEXPIRE', key, window_ms)
    return {1, limit - count - n}
else
    return {0, limit - count}
end
"#;

fn backend_error(err: redis::RedisError) -> CoreError {
    CoreError::new(ErrorCode::Internal, format!("rate-limit backend error: {err}"))
}

/// Shared backend for deployments that run several service replicas
/// against one admission ledger. Connects lazily via an
/// auto-reconnecting `ConnectionManager`.
#[derive(Clone)]
pub struct SharedBackend {
    manager: redis::aio::ConnectionManager,
}

impl SharedBackend {
    pub async fn connect(addr: &str) -> Result<Self, CoreError> {
        let client = redis::Client::open(addr).map_err(backend_error)?;
        let manager = client.get_connection_manager().await.map_err(backend_error)?;
        Ok(Self { manager })
    }
}

impl RateLimitBackend for SharedBackend {
    async fn allow_n(&self, key: &str, params: RateLimitParams, n: u64) -> Result<Admission, CoreError> {
        if params.strategy != Strategy::SlidingWindow {
            return Err(CoreError::new(ErrorCode::Internal, "token bucket is not supported by the shared rate-limit backend"));
        }
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_ms = params.window.as_millis() as i64;
        let mut conn = self.manager.clone();
        let script = redis::Script::new(SLIDING_WINDOW_SCRIPT);
        let (allowed, remaining): (i64, i64) = script
            .key(key)
            .arg(params.requests)
            .arg(window_ms)
            .arg(now_ms)
            .arg(n)
            .invoke_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(Admission { allowed: allowed == 1, remaining: remaining.max(0) as u64, retry_after: None })
    }

    async fn reset(&self, key: &str, _params: RateLimitParams) -> Result<(), CoreError> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await.map_err(backend_error)?;
        Ok(())
    }

    async fn get_info(&self, key: &str, params: RateLimitParams) -> Result<LimitInfo, CoreError> {
        if params.strategy != Strategy::SlidingWindow {
            return Err(CoreError::new(ErrorCode::Internal, "token bucket is not supported by the shared rate-limit backend"));
        }
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_ms = params.window.as_millis() as i64;
        let mut conn = self.manager.clone();
        let _: i64 = conn.zrembyscore(key, "-inf", now_ms - window_ms).await.map_err(backend_error)?;
        let count: i64 = conn.zcard(key).await.map_err(backend_error)?;
        let remaining = (params.requests as i64 - count).max(0) as u64;
        Ok(LimitInfo::from_remaining(params.requests, remaining, params.window))
    }
}

use std::time::Duration;

use wayfare_rate_limit::backend::memory::InMemoryBackend;
use wayfare_rate_limit::{RateLimiter, RateLimiterConfig, Strategy};

fn limiter(strategy: Strategy, requests: u64, window: Duration, burst: u64) -> RateLimiter {
    RateLimiter::new(InMemoryBackend::new(), RateLimiterConfig { strategy, requests, window, burst })
}

#[tokio::test]
async fn sliding_window_allows_within_limit() {
    let limiter = limiter(Strategy::SlidingWindow, 3, Duration::from_secs(1), 0);
    assert!(limiter.allow("key").await.unwrap());
    assert!(limiter.allow("key").await.unwrap());
    assert!(limiter.allow("key").await.unwrap());
}

#[tokio::test]
async fn sliding_window_denies_over_limit() {
    let limiter = limiter(Strategy::SlidingWindow, 2, Duration::from_secs(1), 0);
    assert!(limiter.allow("key").await.unwrap());
    assert!(limiter.allow("key").await.unwrap());
    assert!(!limiter.allow("key").await.unwrap());
}

#[tokio::test]
async fn sliding_window_admits_again_once_the_window_elapses() {
    let limiter = limiter(Strategy::SlidingWindow, 2, Duration::from_millis(100), 0);
    assert!(limiter.allow("key").await.unwrap());
    assert!(limiter.allow("key").await.unwrap());
    assert!(!limiter.allow("key").await.unwrap());
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(limiter.allow("key").await.unwrap());
}

#[tokio::test]
async fn independent_keys_do_not_share_state() {
    let limiter = limiter(Strategy::SlidingWindow, 1, Duration::from_secs(1), 0);
    assert!(limiter.allow("a").await.unwrap());
    assert!(!limiter.allow("a").await.unwrap());
    assert!(limiter.allow("b").await.unwrap());
}

/// §8 scenario 2: R=5/1s, burst=2 admits 7 back-to-back calls, an 8th at
/// the same instant is denied.
#[tokio::test]
async fn token_bucket_admits_a_burst_then_denies() {
    let limiter = limiter(Strategy::TokenBucket, 5, Duration::from_secs(1), 2);
    for _ in 0..7 {
        assert!(limiter.allow("key").await.unwrap());
    }
    assert!(!limiter.allow("key").await.unwrap());
}

#[tokio::test]
async fn reset_immediately_restores_remaining() {
    let limiter = limiter(Strategy::SlidingWindow, 5, Duration::from_secs(1), 0);
    for _ in 0..5 {
        limiter.allow("key").await.unwrap();
    }
    limiter.reset("key").await.unwrap();
    let info = limiter.get_info("key").await.unwrap();
    assert_eq!(info.remaining, 5);
}

#[tokio::test]
async fn wait_admits_once_the_window_rolls_over() {
    let limiter = limiter(Strategy::SlidingWindow, 1, Duration::from_millis(150), 0);
    assert!(limiter.allow("key").await.unwrap());
    let cancel = tokio_util::sync::CancellationToken::new();
    let waited = tokio::time::timeout(Duration::from_secs(2), limiter.wait("key", &cancel)).await;
    assert!(waited.is_ok(), "wait() should admit once a slot frees up");
}

#[tokio::test]
async fn close_is_idempotent_and_fails_fast_after() {
    let limiter = limiter(Strategy::SlidingWindow, 3, Duration::from_secs(1), 0);
    limiter.close().await.unwrap();
    limiter.close().await.unwrap();
    let err = limiter.allow("key").await.unwrap_err();
    assert!(err.to_string().contains("closed"));
}

use std::time::Duration;

use bytes::Bytes;
use wayfare_cache::backend::memory::InMemoryBackend;
use wayfare_cache::Cache;

fn cache() -> Cache {
    Cache::new(InMemoryBackend::new(1000), Duration::from_secs(60))
}

#[tokio::test]
async fn set_then_get_round_trips() {
    let cache = cache();
    cache.set("k", Bytes::from_static(b"v"), Duration::from_secs(30)).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), Bytes::from_static(b"v"));
}

#[tokio::test]
async fn get_on_missing_key_is_not_found() {
    let cache = cache();
    let err = cache.get("missing").await.unwrap_err();
    assert!(err.is(wayfare_core::ErrorCode::NotFound));
}

#[tokio::test]
async fn delete_removes_the_key() {
    let cache = cache();
    cache.set("k", Bytes::from_static(b"v"), Duration::from_secs(30)).await.unwrap();
    cache.delete("k").await.unwrap();
    assert!(!cache.exists("k").await.unwrap());
}

#[tokio::test]
async fn mset_then_mget_returns_every_entry() {
    let cache = cache();
    let entries = vec![("a".to_string(), Bytes::from_static(b"1")), ("b".to_string(), Bytes::from_static(b"2"))];
    cache.mset(&entries, Duration::from_secs(30)).await.unwrap();
    let found = cache.mget(&["a".to_string(), "b".to_string(), "c".to_string()]).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found["a"], Bytes::from_static(b"1"));
}

#[tokio::test]
async fn delete_by_pattern_removes_matching_keys_only() {
    let cache = cache();
    cache.set("solve:dinic:abc", Bytes::from_static(b"1"), Duration::from_secs(30)).await.unwrap();
    cache.set("solve:bfs:abc", Bytes::from_static(b"2"), Duration::from_secs(30)).await.unwrap();
    cache.set("other:abc", Bytes::from_static(b"3"), Duration::from_secs(30)).await.unwrap();
    let deleted = cache.delete_by_pattern("solve:*").await.unwrap();
    assert_eq!(deleted, 2);
    assert!(cache.exists("other:abc").await.unwrap());
}

#[tokio::test]
async fn clear_empties_the_cache() {
    let cache = cache();
    cache.set("a", Bytes::from_static(b"1"), Duration::from_secs(30)).await.unwrap();
    cache.set("b", Bytes::from_static(b"2"), Duration::from_secs(30)).await.unwrap();
    cache.clear().await.unwrap();
    assert_eq!(cache.stats().await.unwrap().key_count, 0);
}

#[tokio::test]
async fn entry_expires_after_its_ttl() {
    let cache = cache();
    cache.set("k", Bytes::from_static(b"v"), Duration::from_millis(20)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(cache.get("k").await.is_err());
}

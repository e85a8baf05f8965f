//! Typed cache wrapper for compute results (flow-solve outputs), keyed by
//! the canonical graph hash, per §4.7's "solve-cache" contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wayfare_core::{CoreError, ErrorCode};
use wayfare_graph_hash::{hash_graph, ResidualGraph};

use crate::{not_found, Cache};

/// Outcome of a solve operation, recorded alongside its numeric results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Timeout,
    IterationLimit,
}

/// One edge of the computed flow, for result inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdgeRecord {
    pub from: String,
    pub to: String,
    pub flow: f64,
    pub capacity: f64,
    pub utilization: f64,
}

/// Cached output of a flow-solve operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSolveResult {
    pub max_flow: f64,
    pub total_cost: f64,
    pub iterations: u64,
    pub compute_time_ms: u64,
    pub status: SolveStatus,
    pub flow_edges: Vec<FlowEdgeRecord>,
    pub computed_at: DateTime<Utc>,
}

/// Typed view over [`Cache`] for idempotent compute requests. Keys are
/// `solve:<algorithm>:<graph-hash>`; a deserialization failure is treated
/// as a corrupted entry — it's evicted and reported as a miss rather than
/// surfaced to the caller.
pub struct SolveCache {
    cache: Cache,
}

impl SolveCache {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    fn key(algorithm: &str, graph: Option<&ResidualGraph>) -> String {
        format!("solve:{algorithm}:{}", hash_graph(graph))
    }

    pub async fn get(&self, graph: Option<&ResidualGraph>, algorithm: &str) -> Result<CachedSolveResult, CoreError> {
        let key = Self::key(algorithm, graph);
        let bytes = self.cache.get(&key).await?;
        match serde_json::from_slice::<CachedSolveResult>(&bytes) {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "corrupted solve-cache entry; evicting");
                let _ = self.cache.delete(&key).await;
                Err(not_found(&key))
            }
        }
    }

    pub async fn set(
        &self,
        graph: Option<&ResidualGraph>,
        algorithm: &str,
        mut result: CachedSolveResult,
        ttl: std::time::Duration,
    ) -> Result<(), CoreError> {
        result.computed_at = Utc::now();
        let key = Self::key(algorithm, graph);
        let bytes = serde_json::to_vec(&result)
            .map_err(|err| CoreError::new(ErrorCode::Internal, format!("solve-cache serialization failed: {err}")))?;
        self.cache.set(&key, bytes, ttl).await
    }

    /// Deletes every cached result for `graph`, across all algorithms.
    pub async fn invalidate(&self, graph: Option<&ResidualGraph>) -> Result<(), CoreError> {
        let hash = hash_graph(graph);
        self.cache.delete_by_pattern(&format!("solve:*:{hash}")).await.map(|_| ())
    }

    /// Deletes every cached solve result, for any graph or algorithm.
    pub async fn invalidate_all(&self) -> Result<(), CoreError> {
        self.cache.delete_by_pattern("solve:*").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;
    use wayfare_graph_hash::{HashEdge, HashNode};

    fn sample_graph() -> ResidualGraph {
        ResidualGraph::new("s", "t")
            .with_node(HashNode::new("s", "source"))
            .with_node(HashNode::new("t", "sink"))
            .with_edge(HashEdge::new("s", "t", 10.0, 1.0, 5.0, "highway"))
    }

    fn sample_result() -> CachedSolveResult {
        CachedSolveResult {
            max_flow: 10.0,
            total_cost: 10.0,
            iterations: 3,
            compute_time_ms: 12,
            status: SolveStatus::Optimal,
            flow_edges: vec![FlowEdgeRecord { from: "s".into(), to: "t".into(), flow: 10.0, capacity: 10.0, utilization: 1.0 }],
            computed_at: Utc::now(),
        }
    }

    fn solve_cache() -> SolveCache {
        SolveCache::new(Cache::new(InMemoryBackend::new(1000), std::time::Duration::from_secs(300)))
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let sc = solve_cache();
        let graph = sample_graph();
        sc.set(Some(&graph), "dinic", sample_result(), std::time::Duration::from_secs(60)).await.unwrap();
        let found = sc.get(Some(&graph), "dinic").await.unwrap();
        assert_eq!(found.max_flow, 10.0);
    }

    #[tokio::test]
    async fn miss_on_uncached_graph() {
        let sc = solve_cache();
        let graph = sample_graph();
        assert!(sc.get(Some(&graph), "dinic").await.is_err());
    }

    #[tokio::test]
    async fn different_algorithms_do_not_share_entries() {
        let sc = solve_cache();
        let graph = sample_graph();
        sc.set(Some(&graph), "dinic", sample_result(), std::time::Duration::from_secs(60)).await.unwrap();
        assert!(sc.get(Some(&graph), "edmonds_karp").await.is_err());
    }

    #[tokio::test]
    async fn invalidate_removes_every_algorithm_for_that_graph() {
        let sc = solve_cache();
        let graph = sample_graph();
        sc.set(Some(&graph), "dinic", sample_result(), std::time::Duration::from_secs(60)).await.unwrap();
        sc.set(Some(&graph), "edmonds_karp", sample_result(), std::time::Duration::from_secs(60)).await.unwrap();
        sc.invalidate(Some(&graph)).await.unwrap();
        assert!(sc.get(Some(&graph), "dinic").await.is_err());
        assert!(sc.get(Some(&graph), "edmonds_karp").await.is_err());
    }

    #[tokio::test]
    async fn corrupted_entry_is_evicted_and_reported_as_a_miss() {
        let sc = solve_cache();
        let graph = sample_graph();
        let key = SolveCache::key("dinic", Some(&graph));
        sc.cache.set(&key, bytes::Bytes::from_static(b"not json"), std::time::Duration::from_secs(60)).await.unwrap();
        assert!(sc.get(Some(&graph), "dinic").await.is_err());
        assert!(!sc.cache.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn invalidate_all_clears_every_solve_entry() {
        let sc = solve_cache();
        let graph = sample_graph();
        sc.set(Some(&graph), "dinic", sample_result(), std::time::Duration::from_secs(60)).await.unwrap();
        sc.invalidate_all().await.unwrap();
        assert!(sc.get(Some(&graph), "dinic").await.is_err());
    }
}

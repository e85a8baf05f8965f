use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;

use dashmap::DashMap;
use prometheus::{
    exponential_buckets, histogram_opts, opts, Encoder, HistogramVec, IntCounterVec, IntGauge,
    IntGaugeVec, Registry, TextEncoder,
};

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Process-wide metrics registry: gRPC request counters, solve operation
/// counters, and a runtime collector, all under a single `prometheus::Registry`.
pub struct Metrics {
    pub registry: Registry,

    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,
    pub requests_in_flight: IntGauge,
    requests_in_flight_by_method: DashMap<&'static str, AtomicI64>,

    pub solve_operations_total: IntCounterVec,
    pub solve_duration_seconds: HistogramVec,
    pub solve_last_max_flow: IntGauge,
    pub graph_size_nodes: HistogramVec,
    pub graph_size_edges: HistogramVec,

    pub runtime_alive_tasks: IntGauge,
    pub runtime_heap_rss_bytes: IntGaugeVec,
}

impl Metrics {
    fn new(config: &MetricsConfig) -> Self {
        let registry = Registry::new();

        let prefix = config
            .namespace
            .as_ref()
            .map(|s| format!("{}_", s))
            .unwrap_or_default();

        let requests_total = IntCounterVec::new(
            opts!(
                format!("{}grpc_requests_total", prefix),
                "Total number of gRPC requests"
            ),
            &["method", "status"],
        )
        .expect("metric can be created");

        let request_duration_seconds = HistogramVec::new(
            histogram_opts!(
                format!("{}grpc_request_duration_seconds", prefix),
                "gRPC request duration in seconds",
                config.latency_buckets.clone()
            ),
            &["method"],
        )
        .expect("metric can be created");

        let requests_in_flight = IntGauge::new(
            format!("{}grpc_requests_in_flight", prefix),
            "Number of gRPC requests currently being processed",
        )
        .expect("metric can be created");

        let solve_operations_total = IntCounterVec::new(
            opts!(
                format!("{}solve_operations_total", prefix),
                "Total number of solve operations"
            ),
            &["algorithm", "status"],
        )
        .expect("metric can be created");

        let solve_duration_seconds = HistogramVec::new(
            histogram_opts!(
                format!("{}solve_duration_seconds", prefix),
                "Solve operation duration in seconds",
                config.latency_buckets.clone()
            ),
            &["algorithm"],
        )
        .expect("metric can be created");

        let solve_last_max_flow = IntGauge::new(
            format!("{}solve_last_max_flow", prefix),
            "Max flow value of the most recently completed solve",
        )
        .expect("metric can be created");

        let graph_size_nodes = HistogramVec::new(
            histogram_opts!(
                format!("{}graph_size_nodes", prefix),
                "Number of nodes in graphs passed to solve operations",
                config.graph_size_buckets.clone()
            ),
            &["operation"],
        )
        .expect("metric can be created");

        let graph_size_edges = HistogramVec::new(
            histogram_opts!(
                format!("{}graph_size_edges", prefix),
                "Number of edges in graphs passed to solve operations",
                config.graph_size_buckets.clone()
            ),
            &["operation"],
        )
        .expect("metric can be created");

        let runtime_alive_tasks = IntGauge::new(
            format!("{}runtime_alive_tasks", prefix),
            "Number of tokio tasks currently alive (stands in for a goroutine count)",
        )
        .expect("metric can be created");

        let runtime_heap_rss_bytes = IntGaugeVec::new(
            opts!(
                format!("{}runtime_heap_rss_bytes", prefix),
                "Resident set size of the process in bytes (stands in for heap alloc; this runtime has no GC pause/run analogue)"
            ),
            &["kind"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(requests_in_flight.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(solve_operations_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(solve_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(solve_last_max_flow.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(graph_size_nodes.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(graph_size_edges.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(runtime_alive_tasks.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(runtime_heap_rss_bytes.clone()))
            .expect("metric can be registered");

        Self {
            registry,
            requests_total,
            request_duration_seconds,
            requests_in_flight,
            requests_in_flight_by_method: DashMap::new(),
            solve_operations_total,
            solve_duration_seconds,
            solve_last_max_flow,
            graph_size_nodes,
            graph_size_edges,
            runtime_alive_tasks,
            runtime_heap_rss_bytes,
        }
    }
}

/// Configuration for the metrics registry.
#[derive(Clone)]
pub struct MetricsConfig {
    pub namespace: Option<String>,
    pub latency_buckets: Vec<f64>,
    pub graph_size_buckets: Vec<f64>,
    pub exclude_paths: Vec<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            // 1ms to ~10s.
            latency_buckets: exponential_buckets(0.001, 2.0, 14).unwrap(),
            // 1 node/edge to ~100k.
            graph_size_buckets: exponential_buckets(1.0, 4.0, 10).unwrap(),
            exclude_paths: vec![],
        }
    }
}

/// Initialize the global metrics registry with the given config. Returns the
/// existing instance if already initialized; the config of the first caller
/// wins, matching `WayfareConfig`'s own first-match-wins semantics.
pub fn init_metrics(config: &MetricsConfig) -> &'static Metrics {
    METRICS.get_or_init(|| Metrics::new(config))
}

/// Get the global metrics instance.
///
/// Panics if [`init_metrics`] has not been called yet.
pub fn metrics() -> &'static Metrics {
    METRICS
        .get()
        .expect("metrics not initialized. Call init_metrics() first.")
}

/// Encode all metrics to Prometheus text format for the `/metrics` endpoint.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = metrics().registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Record a completed gRPC call.
pub fn record_rpc(method: &str, status: &str, duration_secs: f64) {
    let m = metrics();
    m.requests_total.with_label_values(&[method, status]).inc();
    m.request_duration_seconds
        .with_label_values(&[method])
        .observe(duration_secs);
}

/// Record a completed solve operation.
pub fn record_solve(algorithm: &str, success: bool, duration_secs: f64, max_flow: Option<i64>) {
    let m = metrics();
    let status = if success { "success" } else { "failure" };
    m.solve_operations_total
        .with_label_values(&[algorithm, status])
        .inc();
    m.solve_duration_seconds
        .with_label_values(&[algorithm])
        .observe(duration_secs);
    if let Some(max_flow) = max_flow {
        m.solve_last_max_flow.set(max_flow);
    }
}

/// Record the size of a graph passed to a solve operation.
pub fn record_graph_size(operation: &str, nodes: usize, edges: usize) {
    let m = metrics();
    m.graph_size_nodes
        .with_label_values(&[operation])
        .observe(nodes as f64);
    m.graph_size_edges
        .with_label_values(&[operation])
        .observe(edges as f64);
}

/// Mark the start of an in-flight gRPC call for `method`. Pair with
/// [`end_in_flight`].
pub fn start_in_flight(method: &'static str) {
    let m = metrics();
    m.requests_in_flight.inc();
    m.requests_in_flight_by_method
        .entry(method)
        .or_insert_with(|| AtomicI64::new(0))
        .fetch_add(1, Ordering::SeqCst);
}

/// Mark the end of an in-flight gRPC call for `method`. Idempotent in the
/// sense that the per-method and aggregate counters are clamped at zero and
/// never driven negative by an unmatched `end`.
pub fn end_in_flight(method: &'static str) {
    let m = metrics();
    if m.requests_in_flight.get() > 0 {
        m.requests_in_flight.dec();
    }
    if let Some(counter) = m.requests_in_flight_by_method.get(method) {
        let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
            if v > 0 {
                Some(v - 1)
            } else {
                Some(0)
            }
        });
    }
}

/// Current in-flight count for a single method, for tests and diagnostics.
pub fn in_flight_for_method(method: &'static str) -> i64 {
    metrics()
        .requests_in_flight_by_method
        .get(method)
        .map(|c| c.load(Ordering::SeqCst))
        .unwrap_or(0)
}

/// Record the number of currently alive tokio tasks, sampled by the caller
/// (there is no global task registry to pull this from automatically).
pub fn record_alive_tasks(count: i64) {
    metrics().runtime_alive_tasks.set(count);
}

/// Sample process RSS from `/proc/self/status` and publish it under the
/// `rss` label. Best-effort: absent on non-Linux platforms, where this is a
/// no-op.
pub fn sample_process_memory() {
    if let Some(rss_bytes) = read_rss_bytes() {
        metrics()
            .runtime_heap_rss_bytes
            .with_label_values(&["rss"])
            .set(rss_bytes);
    }
}

fn read_rss_bytes() -> Option<i64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let kb: i64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn ensure_metrics() {
        INIT.call_once(|| {
            init_metrics(&MetricsConfig::default());
        });
    }

    #[test]
    fn record_rpc_increments_counter_and_histogram() {
        ensure_metrics();
        record_rpc("MaxFlow", "ok", 0.01);
        let families = metrics().registry.gather();
        assert!(families.iter().any(|f| f.name().ends_with("requests_total")));
    }

    #[test]
    fn in_flight_counter_never_goes_negative() {
        ensure_metrics();
        end_in_flight("GhostMethod");
        end_in_flight("GhostMethod");
        assert_eq!(in_flight_for_method("GhostMethod"), 0);
    }

    #[test]
    fn in_flight_tracks_per_method_breakdown() {
        ensure_metrics();
        start_in_flight("MinCostFlow");
        start_in_flight("MinCostFlow");
        assert_eq!(in_flight_for_method("MinCostFlow"), 2);
        end_in_flight("MinCostFlow");
        assert_eq!(in_flight_for_method("MinCostFlow"), 1);
        end_in_flight("MinCostFlow");
        end_in_flight("MinCostFlow");
        assert_eq!(in_flight_for_method("MinCostFlow"), 0);
    }

    #[test]
    fn record_solve_updates_last_max_flow_gauge() {
        ensure_metrics();
        record_solve("edmonds_karp", true, 0.05, Some(42));
        assert_eq!(metrics().solve_last_max_flow.get(), 42);
    }

    #[test]
    fn record_graph_size_observes_both_histograms() {
        ensure_metrics();
        record_graph_size("max_flow", 100, 250);
        let families = metrics().registry.gather();
        assert!(families.iter().any(|f| f.name().ends_with("graph_size_nodes")));
        assert!(families.iter().any(|f| f.name().ends_with("graph_size_edges")));
    }

    #[test]
    fn encode_metrics_produces_prometheus_text_format() {
        ensure_metrics();
        let text = encode_metrics();
        assert!(text.contains("# HELP") || text.contains("# TYPE") || !text.is_empty());
    }
}

//! Process-wide metrics registry for Wayfare services.
//!
//! Exposes gRPC request counters, solve operation counters, and a runtime
//! collector behind a single [`prometheus::Registry`], served as Prometheus
//! text format over the sidecar listener `wayfare-grpc` starts.

pub mod handler;
pub mod layer;
pub mod metrics;

pub use handler::metrics_handler;
pub use layer::{PrometheusLayer, PrometheusService};
pub use metrics::{
    encode_metrics, end_in_flight, in_flight_for_method, init_metrics, metrics, record_graph_size,
    record_rpc, record_solve, sample_process_memory, start_in_flight, Metrics, MetricsConfig,
};

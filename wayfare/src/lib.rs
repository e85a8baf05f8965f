//! Facade crate: feature-gated re-exports of the Wayfare cross-cutting
//! runtime crates, plus the [`prelude`] a service binary imports to
//! compose them.
//!
//! | Feature       | Default | Crate                 |
//! |---------------|---------|-----------------------|
//! | `metrics`     | yes     | `wayfare-metrics`     |
//! | `audit`       | yes     | `wayfare-audit`       |
//! | `rate-limit`  | yes     | `wayfare-rate-limit`  |
//! | `cache`       | yes     | `wayfare-cache`       |
//! | `grpc`        | yes     | `wayfare-grpc`        |
//! | `db`          | no      | `wayfare-db`          |
//! | `graph-hash`  | no      | `wayfare-graph-hash`  |
//! | `sqlite`/`postgres`/`mysql` | no | `wayfare-db` driver passthrough |
//! | `full`        | no      | All of the above      |

pub use wayfare_core::*;

#[cfg(feature = "metrics")]
pub use wayfare_metrics;

#[cfg(feature = "db")]
pub use wayfare_db;

#[cfg(feature = "audit")]
pub use wayfare_audit;

#[cfg(feature = "rate-limit")]
pub use wayfare_rate_limit;

#[cfg(feature = "cache")]
pub use wayfare_cache;

#[cfg(feature = "grpc")]
pub use wayfare_grpc;

#[cfg(feature = "graph-hash")]
pub use wayfare_graph_hash;

/// Unified prelude — `use wayfare::prelude::*` pulls in the core error and
/// config types plus every enabled subsystem's most commonly used types.
pub mod prelude {
    pub use wayfare_core::prelude::*;

    #[cfg(feature = "metrics")]
    pub use wayfare_metrics::{metrics_handler, MetricsConfig};

    #[cfg(feature = "audit")]
    pub use wayfare_audit::{AuditEntry, AuditEntryBuilder, AuditPipeline, AuditSink};

    #[cfg(feature = "rate-limit")]
    pub use wayfare_rate_limit::{RateLimiter, RateLimiterConfig, Strategy};

    #[cfg(feature = "cache")]
    pub use wayfare_cache::{backend::CacheBackend, Cache};

    #[cfg(feature = "grpc")]
    pub use wayfare_grpc::prelude::*;
    #[cfg(feature = "grpc")]
    pub use wayfare_grpc::{ServiceRuntime, ServiceRuntimeBuilder};

    #[cfg(feature = "graph-hash")]
    pub use wayfare_graph_hash::{hash_graph, short_hash, ResidualGraph};
}

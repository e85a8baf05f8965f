//! The built-in interceptor catalogue, assembled into the default chain
//! by [`crate::runtime::ServiceRuntime`] in the order fixed by §4.8.2:
//! recovery, rate limiting, tracing, metrics, logging, validation, audit.

pub mod audit;
pub mod exclusion;
pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod recovery;
pub mod tracing_span;
pub mod validation;

pub use audit::AuditInterceptor;
pub use exclusion::ExclusionSet;
pub use logging::LoggingInterceptor;
pub use metrics::MetricsInterceptor;
pub use rate_limit::RateLimitInterceptor;
pub use recovery::RecoveryInterceptor;
pub use tracing_span::TracingInterceptor;
pub use validation::{GrpcValidate, ValidationInterceptor};

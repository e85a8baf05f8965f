//! gRPC interceptor chain and service runtime for Wayfare services.
//!
//! [`interceptor`] defines the chain abstraction every cross-cutting
//! concern composes with; [`interceptors`] is the built-in catalogue
//! (recovery, rate limiting, tracing, metrics, logging, validation,
//! audit); [`runtime`] boots and shuts down the gRPC listener plus its
//! sidecar metrics server; [`metadata`] and [`status`] are the shared
//! extraction and wire-mapping helpers the interceptors are built on.

pub mod interceptor;
pub mod interceptors;
pub mod metadata;
pub mod runtime;
pub mod status;

pub use interceptor::{InterceptorChain, Next, RpcContext, RpcInterceptor};
pub use metadata::{request_meta, CallerIdentity};
pub use runtime::{ServiceRuntime, ServiceRuntimeBuilder};
pub use status::{code_label, core_error_to_status, status_to_core_error};

pub use tonic;

pub mod prelude {
    //! Re-exports of the most commonly used gRPC runtime types.
    pub use crate::interceptor::{InterceptorChain, RpcContext, RpcInterceptor};
    pub use crate::interceptors::{
        AuditInterceptor, ExclusionSet, GrpcValidate, LoggingInterceptor, MetricsInterceptor, RateLimitInterceptor,
        RecoveryInterceptor, TracingInterceptor, ValidationInterceptor,
    };
    pub use crate::runtime::ServiceRuntime;
}

//! Wayfare prelude — import everything a service typically needs with a
//! single `use`.
//!
//! ```ignore
//! use wayfare_core::prelude::*;
//! ```

pub use crate::config::sections::{
    AppSection, AuditSection, CacheSection, DatabaseSection, GrpcSection, LogSection,
    MetricsSection, RateLimitSection, TracingSection,
};
pub use crate::config::{ConfigProperties, ConfigValue, ConfigError, FromConfigValue, WayfareConfig};
pub use crate::error::{CoreError, ErrorCode, Severity, ValidationErrors, WireError, WireStatus};
pub use crate::health::{HealthBuilder, HealthIndicator, HealthState, HealthStatus};
pub use crate::logging::{LogConfig, LogFormat, LogOutput};

pub use crate::map_error;
pub use crate::request_span;

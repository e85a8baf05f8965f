pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod prelude;

pub use error::{CoreError, ErrorCode, Severity, ValidationErrors, WireError, WireStatus};
pub use config::{
    ConfigError, ConfigProperties, ConfigValidationError, ConfigValue, DefaultSecretResolver,
    FromConfigValue, MissingKeyError, PropertyMeta, RegisteredSection, SecretResolver,
    WayfareConfig, register_section, registered_sections, validate_keys, validate_section,
};
pub use health::{HealthBuilder, HealthCheck, HealthCheckStatus, HealthIndicator, HealthResponse, HealthState, HealthStatus};
pub use logging::{LogConfig, LogFormat, LogOutput, LoggingGuard};

//! The nine recognized config sections from the config surface: `app`,
//! `grpc`, `log`, `cache`, `rateLimit`, `audit`, `metrics`, `tracing`,
//! `database`. Each is a plain struct implementing [`ConfigProperties`] by
//! hand — hand-written rather than derived, since the derive-macro crate
//! that powers `#[derive(ConfigProperties)]` elsewhere in the ecosystem is
//! out of scope here.

use super::{ConfigError, ConfigProperties, PropertyMeta, WayfareConfig};

fn get_or_default<V: super::FromConfigValue + Clone>(
    config: &WayfareConfig,
    key: &str,
    default: V,
) -> Result<V, ConfigError> {
    match config.get::<V>(key) {
        Ok(v) => Ok(v),
        Err(ConfigError::NotFound(_)) => Ok(default),
        Err(e) => Err(e),
    }
}

/// `app.{name, version, environment}`
#[derive(Debug, Clone)]
pub struct AppSection {
    pub name: String,
    pub version: String,
    pub environment: String,
}

impl AppSection {
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl ConfigProperties for AppSection {
    fn prefix() -> &'static str {
        "app"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::required("name", "app.name", "String", "Service identity used in logs and metrics"),
            PropertyMeta::optional("version", "app.version", "String", "0.0.0", "Service version string"),
            PropertyMeta::optional("environment", "app.environment", "String", "production", "Deployment environment; \"development\" enables reflection"),
        ]
    }

    fn from_config(config: &WayfareConfig) -> Result<Self, ConfigError> {
        Ok(AppSection {
            name: config.get("app.name")?,
            version: get_or_default(config, "app.version", "0.0.0".to_string())?,
            environment: get_or_default(config, "app.environment", "production".to_string())?,
        })
    }
}

/// `grpc.{port, maxRecvMsgSize, maxSendMsgSize, maxConcurrentConn, keepAlive.*, tls.*}`
#[derive(Debug, Clone)]
pub struct GrpcSection {
    pub port: u16,
    pub max_recv_msg_size: u32,
    pub max_send_msg_size: u32,
    pub max_concurrent_conn: u32,
    pub keep_alive_secs: u64,
    pub keep_alive_timeout_secs: u64,
    pub tls_enabled: bool,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

impl ConfigProperties for GrpcSection {
    fn prefix() -> &'static str {
        "grpc"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::optional("port", "grpc.port", "u16", 50051, "Listener port"),
            PropertyMeta::optional("maxRecvMsgSize", "grpc.maxRecvMsgSize", "u32", 4194304, "Max inbound message size in bytes"),
            PropertyMeta::optional("maxSendMsgSize", "grpc.maxSendMsgSize", "u32", 4194304, "Max outbound message size in bytes"),
            PropertyMeta::optional("maxConcurrentConn", "grpc.maxConcurrentConn", "u32", 1000, "Max concurrent connections"),
            PropertyMeta::optional("keepAlive.time", "grpc.keepAlive.time", "u64", 60, "Keepalive ping interval in seconds"),
            PropertyMeta::optional("keepAlive.timeout", "grpc.keepAlive.timeout", "u64", 20, "Keepalive ping ack timeout in seconds"),
            PropertyMeta::optional("tls.enabled", "grpc.tls.enabled", "bool", false, "Enable TLS termination"),
        ]
    }

    fn from_config(config: &WayfareConfig) -> Result<Self, ConfigError> {
        let port: i64 = get_or_default(config, "grpc.port", 50051)?;
        let port = u16::try_from(port)
            .map_err(|_| ConfigError::TypeMismatch { key: "grpc.port".into(), expected: "u16" })?;
        Ok(GrpcSection {
            port,
            max_recv_msg_size: get_or_default(config, "grpc.maxRecvMsgSize", 4_194_304)?,
            max_send_msg_size: get_or_default(config, "grpc.maxSendMsgSize", 4_194_304)?,
            max_concurrent_conn: get_or_default(config, "grpc.maxConcurrentConn", 1000)?,
            keep_alive_secs: get_or_default(config, "grpc.keepAlive.time", 60)?,
            keep_alive_timeout_secs: get_or_default(config, "grpc.keepAlive.timeout", 20)?,
            tls_enabled: get_or_default(config, "grpc.tls.enabled", false)?,
            tls_cert_path: config.get("grpc.tls.certPath").ok(),
            tls_key_path: config.get("grpc.tls.keyPath").ok(),
        })
    }
}

/// `log.{level, format, output, filePath, maxSize, maxBackups, maxAge, compress}`
#[derive(Debug, Clone)]
pub struct LogSection {
    pub level: String,
    pub format: String,
    pub output: String,
    pub file_path: Option<String>,
    pub max_size_mb: u64,
    pub max_backups: u32,
    pub max_age_days: u32,
    pub compress: bool,
}

impl ConfigProperties for LogSection {
    fn prefix() -> &'static str {
        "log"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::optional("level", "log.level", "String", "info", "debug, info, warn, or error"),
            PropertyMeta::optional("format", "log.format", "String", "json", "json or text"),
            PropertyMeta::optional("output", "log.output", "String", "stdout", "stdout, stderr, or file"),
            PropertyMeta::optional("filePath", "log.filePath", "String", "", "Log file path when output=file"),
            PropertyMeta::optional("maxSize", "log.maxSize", "u64", 100, "Rotation size threshold in MB"),
            PropertyMeta::optional("maxBackups", "log.maxBackups", "u32", 7, "Number of rotated files to keep"),
            PropertyMeta::optional("maxAge", "log.maxAge", "u32", 28, "Max age of rotated files in days"),
            PropertyMeta::optional("compress", "log.compress", "bool", false, "Gzip rotated files"),
        ]
    }

    fn from_config(config: &WayfareConfig) -> Result<Self, ConfigError> {
        Ok(LogSection {
            level: get_or_default(config, "log.level", "info".to_string())?,
            format: get_or_default(config, "log.format", "json".to_string())?,
            output: get_or_default(config, "log.output", "stdout".to_string())?,
            file_path: config.get("log.filePath").ok(),
            max_size_mb: get_or_default(config, "log.maxSize", 100)?,
            max_backups: get_or_default(config, "log.maxBackups", 7)?,
            max_age_days: get_or_default(config, "log.maxAge", 28)?,
            compress: get_or_default(config, "log.compress", false)?,
        })
    }
}

/// `cache.{enabled, driver, host, port, password, db, defaultTtl, maxEntries}`
#[derive(Debug, Clone)]
pub struct CacheSection {
    pub enabled: bool,
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u32,
    pub default_ttl_secs: u64,
    pub max_entries: u64,
}

impl ConfigProperties for CacheSection {
    fn prefix() -> &'static str {
        "cache"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::optional("enabled", "cache.enabled", "bool", true, "Enable the cache layer"),
            PropertyMeta::optional("driver", "cache.driver", "String", "memory", "memory or redis"),
            PropertyMeta::optional("host", "cache.host", "String", "localhost", "Redis host, when driver=redis"),
            PropertyMeta::optional("port", "cache.port", "u16", 6379, "Redis port, when driver=redis"),
            PropertyMeta::optional("db", "cache.db", "u32", 0, "Redis logical db index"),
            PropertyMeta::optional("defaultTtl", "cache.defaultTtl", "u64", 300, "Default TTL in seconds"),
            PropertyMeta::optional("maxEntries", "cache.maxEntries", "u64", 100_000, "Max entries for the in-memory driver"),
        ]
    }

    fn from_config(config: &WayfareConfig) -> Result<Self, ConfigError> {
        let driver: String = get_or_default(config, "cache.driver", "memory".to_string())?;
        if driver != "memory" && driver != "redis" {
            return Err(ConfigError::Validation(vec![super::ConfigValidationDetail {
                key: "cache.driver".to_string(),
                message: format!("must be 'memory' or 'redis', got '{driver}'"),
            }]));
        }
        Ok(CacheSection {
            enabled: get_or_default(config, "cache.enabled", true)?,
            driver,
            host: get_or_default(config, "cache.host", "localhost".to_string())?,
            port: get_or_default(config, "cache.port", 6379)?,
            password: config.get("cache.password").ok(),
            db: get_or_default(config, "cache.db", 0)?,
            default_ttl_secs: get_or_default(config, "cache.defaultTtl", 300)?,
            max_entries: get_or_default(config, "cache.maxEntries", 100_000)?,
        })
    }
}

/// `rateLimit.{enabled, requests, window, strategy, backend, burstSize, cleanupInterval, redisAddr}`
#[derive(Debug, Clone)]
pub struct RateLimitSection {
    pub enabled: bool,
    pub requests: u64,
    pub window_secs: u64,
    pub strategy: String,
    pub backend: String,
    pub burst_size: u64,
    pub cleanup_interval_secs: u64,
    pub redis_addr: Option<String>,
}

impl ConfigProperties for RateLimitSection {
    fn prefix() -> &'static str {
        "rateLimit"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::optional("enabled", "rateLimit.enabled", "bool", true, "Enable rate limiting"),
            PropertyMeta::optional("requests", "rateLimit.requests", "u64", 100, "Requests allowed per window"),
            PropertyMeta::optional("window", "rateLimit.window", "u64", 1, "Window length in seconds"),
            PropertyMeta::optional("strategy", "rateLimit.strategy", "String", "sliding_window", "sliding_window or token_bucket"),
            PropertyMeta::optional("backend", "rateLimit.backend", "String", "memory", "memory or redis"),
            PropertyMeta::optional("burstSize", "rateLimit.burstSize", "u64", 0, "Extra burst capacity for token_bucket"),
            PropertyMeta::optional("cleanupInterval", "rateLimit.cleanupInterval", "u64", 60, "Janitor sweep interval in seconds"),
        ]
    }

    fn from_config(config: &WayfareConfig) -> Result<Self, ConfigError> {
        let strategy: String = get_or_default(config, "rateLimit.strategy", "sliding_window".to_string())?;
        if strategy != "sliding_window" && strategy != "token_bucket" {
            return Err(ConfigError::Validation(vec![super::ConfigValidationDetail {
                key: "rateLimit.strategy".to_string(),
                message: format!("must be 'sliding_window' or 'token_bucket', got '{strategy}'"),
            }]));
        }
        let backend: String = get_or_default(config, "rateLimit.backend", "memory".to_string())?;
        if backend != "memory" && backend != "redis" {
            return Err(ConfigError::Validation(vec![super::ConfigValidationDetail {
                key: "rateLimit.backend".to_string(),
                message: format!("must be 'memory' or 'redis', got '{backend}'"),
            }]));
        }
        let requests: u64 = get_or_default(config, "rateLimit.requests", 100)?;
        if requests == 0 {
            return Err(ConfigError::Validation(vec![super::ConfigValidationDetail {
                key: "rateLimit.requests".to_string(),
                message: "must be > 0".to_string(),
            }]));
        }
        let window_secs: u64 = get_or_default(config, "rateLimit.window", 1)?;
        if window_secs == 0 {
            return Err(ConfigError::Validation(vec![super::ConfigValidationDetail {
                key: "rateLimit.window".to_string(),
                message: "must be > 0".to_string(),
            }]));
        }
        Ok(RateLimitSection {
            enabled: get_or_default(config, "rateLimit.enabled", true)?,
            requests,
            window_secs,
            strategy,
            backend,
            burst_size: get_or_default(config, "rateLimit.burstSize", 0)?,
            cleanup_interval_secs: get_or_default(config, "rateLimit.cleanupInterval", 60)?,
            redis_addr: config.get("rateLimit.redisAddr").ok(),
        })
    }
}

/// `audit.{enabled, backend, filePath, bufferSize, flushPeriod, excludeMethods, includeRequest, includeResponse, maskFields}`
#[derive(Debug, Clone)]
pub struct AuditSection {
    pub enabled: bool,
    pub backend: String,
    pub file_path: Option<String>,
    pub buffer_size: usize,
    pub flush_period_secs: u64,
    pub exclude_methods: Vec<String>,
    pub include_request: bool,
    pub include_response: bool,
    pub mask_fields: Vec<String>,
}

impl ConfigProperties for AuditSection {
    fn prefix() -> &'static str {
        "audit"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::optional("enabled", "audit.enabled", "bool", true, "Enable the audit pipeline"),
            PropertyMeta::optional("backend", "audit.backend", "String", "stdout", "stdout, file, or grpc"),
            PropertyMeta::optional("bufferSize", "audit.bufferSize", "usize", 1024, "Bounded queue capacity"),
            PropertyMeta::optional("flushPeriod", "audit.flushPeriod", "u64", 5, "Batch flush interval in seconds"),
            PropertyMeta::optional("includeRequest", "audit.includeRequest", "bool", true, "Record request payloads"),
            PropertyMeta::optional("includeResponse", "audit.includeResponse", "bool", false, "Record response payloads"),
        ]
    }

    fn from_config(config: &WayfareConfig) -> Result<Self, ConfigError> {
        let backend: String = get_or_default(config, "audit.backend", "stdout".to_string())?;
        if !["stdout", "file", "grpc"].contains(&backend.as_str()) {
            return Err(ConfigError::Validation(vec![super::ConfigValidationDetail {
                key: "audit.backend".to_string(),
                message: format!("must be 'stdout', 'file', or 'grpc', got '{backend}'"),
            }]));
        }
        Ok(AuditSection {
            enabled: get_or_default(config, "audit.enabled", true)?,
            backend,
            file_path: config.get("audit.filePath").ok(),
            buffer_size: get_or_default(config, "audit.bufferSize", 1024)?,
            flush_period_secs: get_or_default(config, "audit.flushPeriod", 5)?,
            exclude_methods: config.get("audit.excludeMethods").unwrap_or_default(),
            include_request: get_or_default(config, "audit.includeRequest", true)?,
            include_response: get_or_default(config, "audit.includeResponse", false)?,
            mask_fields: config.get("audit.maskFields").unwrap_or_default(),
        })
    }
}

/// `metrics.{enabled, port, path, namespace}`
#[derive(Debug, Clone)]
pub struct MetricsSection {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
    pub namespace: String,
}

impl ConfigProperties for MetricsSection {
    fn prefix() -> &'static str {
        "metrics"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::optional("enabled", "metrics.enabled", "bool", true, "Expose the /metrics endpoint"),
            PropertyMeta::optional("port", "metrics.port", "u16", 9090, "Sidecar HTTP listener port"),
            PropertyMeta::optional("path", "metrics.path", "String", "/metrics", "Scrape path"),
            PropertyMeta::optional("namespace", "metrics.namespace", "String", "wayfare", "Metric name prefix"),
        ]
    }

    fn from_config(config: &WayfareConfig) -> Result<Self, ConfigError> {
        Ok(MetricsSection {
            enabled: get_or_default(config, "metrics.enabled", true)?,
            port: get_or_default(config, "metrics.port", 9090)?,
            path: get_or_default(config, "metrics.path", "/metrics".to_string())?,
            namespace: get_or_default(config, "metrics.namespace", "wayfare".to_string())?,
        })
    }
}

/// `tracing.{enabled, endpoint, serviceName, sampleRate}`
#[derive(Debug, Clone)]
pub struct TracingSection {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub service_name: String,
    pub sample_rate: f64,
}

impl ConfigProperties for TracingSection {
    fn prefix() -> &'static str {
        "tracing"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::optional("enabled", "tracing.enabled", "bool", false, "Enable distributed tracing export"),
            PropertyMeta::optional("serviceName", "tracing.serviceName", "String", "wayfare", "Service name attached to spans"),
            PropertyMeta::optional("sampleRate", "tracing.sampleRate", "f64", 1.0, "Fraction of traces sampled, 0.0-1.0"),
        ]
    }

    fn from_config(config: &WayfareConfig) -> Result<Self, ConfigError> {
        let sample_rate: f64 = get_or_default(config, "tracing.sampleRate", 1.0)?;
        if !(0.0..=1.0).contains(&sample_rate) {
            return Err(ConfigError::Validation(vec![super::ConfigValidationDetail {
                key: "tracing.sampleRate".to_string(),
                message: format!("must be within 0.0..=1.0, got {sample_rate}"),
            }]));
        }
        Ok(TracingSection {
            enabled: get_or_default(config, "tracing.enabled", false)?,
            endpoint: config.get("tracing.endpoint").ok(),
            service_name: get_or_default(config, "tracing.serviceName", "wayfare".to_string())?,
            sample_rate,
        })
    }
}

/// `database.{url, maxOpen, minIdle, maxLifetime, maxIdleTime, connectTimeout}`
#[derive(Debug, Clone)]
pub struct DatabaseSection {
    pub url: String,
    pub max_open: u32,
    pub min_idle: u32,
    pub max_lifetime_secs: u64,
    pub max_idle_time_secs: u64,
    pub connect_timeout_secs: u64,
}

impl ConfigProperties for DatabaseSection {
    fn prefix() -> &'static str {
        "database"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta::required("url", "database.url", "String", "Connection string"),
            PropertyMeta::optional("maxOpen", "database.maxOpen", "u32", 10, "Max open connections"),
            PropertyMeta::optional("minIdle", "database.minIdle", "u32", 1, "Min idle connections kept warm"),
            PropertyMeta::optional("maxLifetime", "database.maxLifetime", "u64", 1800, "Max connection lifetime in seconds"),
            PropertyMeta::optional("maxIdleTime", "database.maxIdleTime", "u64", 600, "Max idle time before eviction in seconds"),
            PropertyMeta::optional("connectTimeout", "database.connectTimeout", "u64", 10, "Connect timeout in seconds"),
        ]
    }

    fn from_config(config: &WayfareConfig) -> Result<Self, ConfigError> {
        let max_open: u32 = get_or_default(config, "database.maxOpen", 10)?;
        if max_open == 0 {
            return Err(ConfigError::Validation(vec![super::ConfigValidationDetail {
                key: "database.maxOpen".to_string(),
                message: "must be > 0".to_string(),
            }]));
        }
        Ok(DatabaseSection {
            url: config.get("database.url")?,
            max_open,
            min_idle: get_or_default(config, "database.minIdle", 1)?,
            max_lifetime_secs: get_or_default(config, "database.maxLifetime", 1800)?,
            max_idle_time_secs: get_or_default(config, "database.maxIdleTime", 600)?,
            connect_timeout_secs: get_or_default(config, "database.connectTimeout", 10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grpc_section_defaults_when_absent() {
        let cfg = WayfareConfig::empty();
        let grpc = GrpcSection::from_config(&cfg).unwrap();
        assert_eq!(grpc.port, 50051);
        assert_eq!(grpc.max_recv_msg_size, 4_194_304);
        assert!(!grpc.tls_enabled);
    }

    #[test]
    fn cache_section_rejects_unknown_driver() {
        let mut cfg = WayfareConfig::empty();
        cfg.set("cache.driver", super::super::ConfigValue::String("memcached".into()));
        assert!(CacheSection::from_config(&cfg).is_err());
    }

    #[test]
    fn rate_limit_section_rejects_zero_requests() {
        let mut cfg = WayfareConfig::empty();
        cfg.set("rateLimit.requests", super::super::ConfigValue::Integer(0));
        assert!(RateLimitSection::from_config(&cfg).is_err());
    }

    #[test]
    fn database_section_requires_url() {
        let cfg = WayfareConfig::empty();
        assert!(DatabaseSection::from_config(&cfg).is_err());
    }

    #[test]
    fn tracing_section_rejects_out_of_range_sample_rate() {
        let mut cfg = WayfareConfig::empty();
        cfg.set("tracing.sampleRate", super::super::ConfigValue::Float(1.5));
        assert!(TracingSection::from_config(&cfg).is_err());
    }

    #[test]
    fn app_section_detects_development_environment() {
        let mut cfg = WayfareConfig::empty();
        cfg.set("app.name", super::super::ConfigValue::String("routing".into()));
        cfg.set("app.environment", super::super::ConfigValue::String("development".into()));
        let app = AppSection::from_config(&cfg).unwrap();
        assert!(app.is_development());
    }
}

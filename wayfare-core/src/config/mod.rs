mod loader;
pub mod registry;
pub mod sections;
pub mod secrets;
pub mod typed;
pub mod validation;
pub mod value;

use std::collections::HashMap;
use std::ops::Deref;

pub use registry::{register_section, registered_sections, RegisteredSection};
pub use secrets::{DefaultSecretResolver, SecretResolver};
pub use typed::{ConfigProperties, PropertyMeta};
pub use validation::{validate_keys, validate_section, ConfigValidationError, MissingKeyError};
pub use value::{ConfigValue, FromConfigValue};

/// A single validation error detail from typed config validation.
#[derive(Debug, Clone)]
pub struct ConfigValidationDetail {
    pub key: String,
    pub message: String,
}

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
    /// A required key was missing or a numeric value was out of range.
    Validation(Vec<ConfigValidationDetail>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "config load error: {msg}"),
            ConfigError::Validation(details) => {
                write!(f, "config validation errors:")?;
                for detail in details {
                    write!(f, "\n  - {}: {}", detail.key, detail.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Application configuration loaded from a YAML file and environment
/// variables.
///
/// `WayfareConfig` (= `WayfareConfig<()>`) provides raw key-value access
/// only. `WayfareConfig<T>` adds typed access to a validated config struct
/// via `Deref<Target = T>`.
///
/// Resolution order (lowest to highest priority):
/// 1. Built-in defaults (applied by [`WayfareConfig::load_with_service_defaults`])
/// 2. The first existing file among `./config.yaml`, `./config/config.yaml`,
///    `/etc/<app>/config.yaml`
/// 3. Environment variables, `PREFIX_SECTION__KEY` convention (e.g.
///    `APP_GRPC__PORT` overrides `grpc.port` under prefix `app`)
#[derive(Debug, Clone)]
pub struct WayfareConfig<T = ()> {
    values: HashMap<String, ConfigValue>,
    env_prefix: String,
    typed: T,
}

// ── Constructors — only on WayfareConfig (= WayfareConfig<()>) ─────────

impl WayfareConfig {
    /// Load configuration using the given environment variable prefix
    /// (case-insensitive, no trailing underscore, e.g. `"app"`).
    ///
    /// Looks for the first existing config file on the standard search
    /// path, then overlays environment variables under `prefix`.
    pub fn load(app_name: &str, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_first_existing_file(app_name, &mut values)?;
        loader::overlay_env_vars(env_prefix, &mut values);
        Ok(WayfareConfig { values, env_prefix: env_prefix.to_string(), typed: () })
    }

    /// Load configuration and apply per-service identity and port
    /// defaults before the file/env overlays take effect, so either can
    /// still override them.
    pub fn load_with_service_defaults(
        name: &str,
        default_port: u16,
        env_prefix: &str,
    ) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        values.insert("app.name".to_string(), ConfigValue::String(name.to_string()));
        values.insert("grpc.port".to_string(), ConfigValue::Integer(default_port as i64));
        loader::load_first_existing_file(name, &mut values)?;
        loader::overlay_env_vars(env_prefix, &mut values);
        Ok(WayfareConfig { values, env_prefix: env_prefix.to_string(), typed: () })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(WayfareConfig { values, env_prefix: env_prefix.to_string(), typed: () })
    }

    /// Create an empty config (useful for testing).
    pub fn empty() -> Self {
        WayfareConfig { values: HashMap::new(), env_prefix: String::new(), typed: () }
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Upgrade to a typed config by constructing `T` from the raw values.
    pub fn with_typed<C: ConfigProperties>(self) -> Result<WayfareConfig<C>, ConfigError> {
        let typed = C::from_config(&self)?;
        Ok(WayfareConfig { values: self.values, env_prefix: self.env_prefix, typed })
    }
}

// ── Methods available on all WayfareConfig<T> ───────────────────────────

impl<T> WayfareConfig<T> {
    /// Get a typed value for the given dot-separated key (raw access).
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, returning a default if the key is missing.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    /// Check whether a key exists in the config.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The environment variable prefix this config was loaded under.
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Get a reference to the typed config layer.
    pub fn typed(&self) -> &T {
        &self.typed
    }

    /// Downgrade to a raw (untyped) config, discarding the typed layer.
    pub fn raw(&self) -> WayfareConfig {
        WayfareConfig {
            values: self.values.clone(),
            env_prefix: self.env_prefix.clone(),
            typed: (),
        }
    }
}

// ── Deref for ergonomic typed field access ──────────────────────────────

impl<T> Deref for WayfareConfig<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.typed
    }
}

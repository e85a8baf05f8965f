use super::{ConfigError, WayfareConfig};

/// Metadata about a single configuration property.
#[derive(Debug, Clone)]
pub struct PropertyMeta {
    /// Relative key (e.g., `"port"`).
    pub key: String,
    /// Absolute key (e.g., `"grpc.port"`).
    pub full_key: String,
    /// Rust type name (e.g., `"i64"`).
    pub type_name: &'static str,
    /// Whether the property is required (no default and not `Option`).
    pub required: bool,
    /// Default value as a string, if any.
    pub default_value: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
}

impl PropertyMeta {
    pub fn required(key: &str, full_key: &str, type_name: &'static str, description: &str) -> Self {
        PropertyMeta {
            key: key.to_string(),
            full_key: full_key.to_string(),
            type_name,
            required: true,
            default_value: None,
            description: Some(description.to_string()),
        }
    }

    pub fn optional(key: &str, full_key: &str, type_name: &'static str, default: impl std::fmt::Display, description: &str) -> Self {
        PropertyMeta {
            key: key.to_string(),
            full_key: full_key.to_string(),
            type_name,
            required: false,
            default_value: Some(default.to_string()),
            description: Some(description.to_string()),
        }
    }
}

/// Trait for strongly-typed configuration sections.
///
/// Each Wayfare-recognized config section (`grpc.*`, `log.*`, `cache.*`, ...)
/// implements this by hand; see [`super::sections`] for the nine built-in
/// sections named in the config surface.
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (e.g., `"grpc"`).
    fn prefix() -> &'static str;

    /// Metadata about all expected properties.
    fn properties_metadata() -> Vec<PropertyMeta>;

    /// Construct from a `WayfareConfig` instance, applying defaults for
    /// missing optional keys and failing on missing required ones or
    /// out-of-range numerics.
    fn from_config(config: &WayfareConfig) -> Result<Self, ConfigError>;
}

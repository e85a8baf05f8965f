use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::value::ConfigValue;
use super::ConfigError;

/// Search order for the config file, lowest to highest specificity:
/// `./config.yaml`, `./config/config.yaml`, `/etc/<app>/config.yaml`.
///
/// The first candidate that exists wins; the others are not merged in. If
/// none exist, loading proceeds with only built-in defaults and environment
/// variables.
pub(crate) fn config_file_search_path(app_name: &str) -> Vec<PathBuf> {
    vec![
        PathBuf::from("config.yaml"),
        PathBuf::from("config/config.yaml"),
        PathBuf::from(format!("/etc/{app_name}/config.yaml")),
    ]
}

/// Load and parse a YAML file, flattening it into the values map. A missing
/// file is not an error; it simply contributes nothing.
pub(crate) fn load_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if path.exists() {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?;
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Load(e.to_string()))?;
        flatten_yaml("", &yaml, values);
    }
    Ok(())
}

/// Load the first config file found on [`config_file_search_path`].
pub(crate) fn load_first_existing_file(
    app_name: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    for candidate in config_file_search_path(app_name) {
        if candidate.exists() {
            return load_yaml_file(&candidate, values);
        }
    }
    Ok(())
}

/// Parse a YAML string and flatten it into the values map.
pub(crate) fn load_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys.
pub(crate) fn flatten_yaml(
    prefix: &str,
    value: &serde_yaml::Value,
    out: &mut HashMap<String, ConfigValue>,
) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key_str = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key_str
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            if !prefix.is_empty() {
                out.insert(
                    prefix.to_string(),
                    ConfigValue::List(seq.iter().map(ConfigValue::from_yaml).collect()),
                );
                for (i, item) in seq.iter().enumerate() {
                    let indexed_key = format!("{prefix}.{i}");
                    flatten_yaml(&indexed_key, item, out);
                }
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
            }
        }
    }
}

/// Overlay environment variables onto `values` using the
/// `PREFIX_SECTION__KEY` convention, e.g. `APP_GRPC__PORT=50054` becomes
/// `grpc.port`. The leading `prefix` (case-insensitive, with or without a
/// trailing underscore) is stripped; `__` inside the remainder introduces a
/// nesting level, and single `_` within a segment separates the words of a
/// camelCase section key (so `MAX_RECV_MSG_SIZE` recovers as
/// `maxRecvMsgSize`, matching the key the section readers look up).
pub(crate) fn overlay_env_vars(
    prefix: &str,
    values: &mut HashMap<String, ConfigValue>,
) {
    let shout_prefix = format!("{}_", prefix.to_uppercase());
    for (env_key, env_val) in std::env::vars() {
        let Some(rest) = env_key.strip_prefix(&shout_prefix) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let config_key = rest
            .split("__")
            .map(screaming_snake_to_camel)
            .collect::<Vec<_>>()
            .join(".");
        values.insert(config_key, ConfigValue::from_env_str(&env_val));
    }
}

/// Converts one `_`-separated, `SCREAMING_CASE` segment to camelCase:
/// the first word is lowercased, every later word is lowercased then
/// capitalized, and the words are joined without a separator.
fn screaming_snake_to_camel(segment: &str) -> String {
    let mut words = segment.split('_').filter(|w| !w.is_empty());
    let Some(first) = words.next() else {
        return String::new();
    };
    let mut camel = first.to_lowercase();
    for word in words {
        let mut chars = word.chars();
        if let Some(c) = chars.next() {
            camel.push(c.to_ascii_uppercase());
            camel.push_str(&chars.as_str().to_lowercase());
        }
    }
    camel
}

//! Configuration loading and path resolution.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::placeholder::placeholder_keys;
use super::settings::Settings;
use crate::errors::{GuardError, MissingConfigError, MissingKeyError, PlaceholderError, Result};

/// A validated project configuration.
///
/// Nested tables are flattened to dotted keys (`paths.data`). A
/// `Configuration` is only ever produced by [`ConfigResolver::load`], so it
/// never contains placeholder values and holds every key the template
/// declares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    source: PathBuf,
    values: BTreeMap<String, serde_json::Value>,
}

impl Configuration {
    /// Returns the file this configuration was loaded from.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Gets a value by (dotted) key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Gets a string value by key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(serde_json::Value::as_str)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterates over the keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the configuration has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the typed view of the recognized options.
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings::from_config(self)
    }

    /// Returns the flattened values as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.values.clone().into_iter().collect())
    }
}

/// Loads a configuration and validates it against its template.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    template_path: PathBuf,
    config_path: PathBuf,
}

impl ConfigResolver {
    /// Creates a resolver for a template / actual config pair.
    #[must_use]
    pub fn new(template_path: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            config_path: config_path.into(),
        }
    }

    /// Returns the template path.
    #[must_use]
    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Returns the actual config path.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Loads and validates the configuration.
    ///
    /// Fails with `MissingConfig` if either file is absent, `ConfigParse` if
    /// either is malformed, `Placeholder` if any value is still a template
    /// placeholder, and `MissingKey` if a template key is absent.
    pub fn load(&self) -> Result<Configuration> {
        if !self.template_path.is_file() {
            return Err(MissingConfigError::template(&self.template_path).into());
        }
        if !self.config_path.is_file() {
            return Err(MissingConfigError::new(&self.config_path, &self.template_path).into());
        }

        let template = read_flattened(&self.template_path)?;
        let values = read_flattened(&self.config_path)?;

        let unresolved = placeholder_keys(&values);
        if !unresolved.is_empty() {
            return Err(PlaceholderError::new(&self.config_path, unresolved).into());
        }

        if let Some(key) = template.keys().find(|k| !values.contains_key(*k)) {
            return Err(MissingKeyError::new(&self.config_path, &self.template_path, key).into());
        }

        for extra in values.keys().filter(|k| !template.contains_key(*k)) {
            debug!(key = %extra, "Configuration key not declared in template");
        }

        info!(
            config = %self.config_path.display(),
            keys = values.len(),
            "Configuration loaded"
        );

        Ok(Configuration {
            source: self.config_path.clone(),
            values,
        })
    }

    /// Returns the configured path for `key`, or `default` when unset.
    ///
    /// Never fails: non-string values fall back to `default` as well.
    #[must_use]
    pub fn resolve_path(config: &Configuration, key: &str, default: impl AsRef<Path>) -> PathBuf {
        config
            .get_str(key)
            .map_or_else(|| default.as_ref().to_path_buf(), PathBuf::from)
    }
}

/// Loads a configuration from `actual_path`, validated against `template_path`.
pub fn load(template_path: impl AsRef<Path>, actual_path: impl AsRef<Path>) -> Result<Configuration> {
    ConfigResolver::new(template_path.as_ref(), actual_path.as_ref()).load()
}

/// Returns the configured path for `key`, or `default`.
#[must_use]
pub fn resolve_path(config: &Configuration, key: &str, default: impl AsRef<Path>) -> PathBuf {
    ConfigResolver::resolve_path(config, key, default)
}

fn read_flattened(path: &Path) -> Result<BTreeMap<String, serde_json::Value>> {
    let text = fs::read_to_string(path)?;
    let parse_error = |message: String| GuardError::ConfigParse {
        path: path.to_path_buf(),
        message,
    };

    let root = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str::<serde_json::Value>(&text).map_err(|e| parse_error(e.to_string()))?
    } else {
        let table = text
            .parse::<toml::Table>()
            .map_err(|e| parse_error(e.to_string()))?;
        toml_to_json(toml::Value::Table(table))
    };

    let serde_json::Value::Object(map) = root else {
        return Err(parse_error("top level must be a table of options".to_string()));
    };

    let mut flat = BTreeMap::new();
    flatten_into("", map, &mut flat);
    Ok(flat)
}

fn flatten_into(
    prefix: &str,
    map: serde_json::Map<String, serde_json::Value>,
    out: &mut BTreeMap<String, serde_json::Value>,
) {
    for (key, value) in map {
        let full = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            serde_json::Value::Object(nested) => flatten_into(&full, nested, out),
            other => {
                out.insert(full, other);
            }
        }
    }
}

fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::Value::from(i),
        toml::Value::Float(f) => serde_json::Value::from(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

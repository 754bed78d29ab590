//! Error types for the provguard framework.
//!
//! Every error carries an [`ErrorInfo`] so that a user-facing failure always
//! pairs what went wrong with how to fix it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for provguard operations.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The configuration file (or its template) does not exist.
    #[error("{0}")]
    MissingConfig(#[from] MissingConfigError),

    /// The configuration still contains template placeholder values.
    #[error("{0}")]
    Placeholder(#[from] PlaceholderError),

    /// A key declared in the template is absent from the configuration.
    #[error("{0}")]
    MissingKey(#[from] MissingKeyError),

    /// A configuration file could not be parsed.
    #[error("Failed to parse configuration {}: {message}", path.display())]
    ConfigParse {
        /// The offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// An output directory is not writable.
    #[error("{0}")]
    Write(#[from] WriteError),

    /// A sidecar path is occupied by a file provguard did not create.
    #[error("Refusing to overwrite {}: it was not created by provguard", path.display())]
    SidecarConflict {
        /// The occupied path.
        path: PathBuf,
    },

    /// A declared output lies outside the writable layout.
    #[error("Output {} is outside processed/ and reports/ under {}", path.display(), root.display())]
    LayoutViolation {
        /// The rejected output path.
        path: PathBuf,
        /// The layout root.
        root: PathBuf,
    },

    /// The wrapped step failed.
    #[error("{0}")]
    Step(#[from] StepError),

    /// The log subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuardError {
    /// Returns true for errors that must abort a whole run before any item starts.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingConfig(_)
                | Self::Placeholder(_)
                | Self::MissingKey(_)
                | Self::ConfigParse { .. }
        )
    }

    /// Returns the diagnostic info (code, summary, fix hint) for this error.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        match self {
            Self::MissingConfig(e) => e.info(),
            Self::Placeholder(e) => e.info(),
            Self::MissingKey(e) => e.info(),
            Self::ConfigParse { path, .. } => {
                ErrorInfo::new("CONFIG-PARSE", self.to_string())
                    .with_fix_hint(format!("Fix the syntax of {}.", path.display()))
            }
            Self::Write(e) => e.info(),
            Self::SidecarConflict { path } => ErrorInfo::new("SIDECAR-CONFLICT", self.to_string())
                .with_fix_hint(format!(
                    "Move or rename {} so the provenance sidecar can be written.",
                    path.display()
                )),
            Self::LayoutViolation { root, .. } => {
                ErrorInfo::new("LAYOUT-VIOLATION", self.to_string()).with_fix_hint(format!(
                    "Declare outputs under {}/processed/<script>/ or {}/reports/.",
                    root.display(),
                    root.display()
                ))
            }
            Self::Step(e) => ErrorInfo::new("STEP-FAILED", self.to_string())
                .with_context_entry("step", e.step.clone())
                .with_context_entry("item", e.item.clone()),
            Self::Logging(_) => ErrorInfo::new("LOGGING", self.to_string()).with_fix_hint(
                "Install logging once per process, before the first guarded step runs.",
            ),
            Self::Serialization(_) => ErrorInfo::new("SERIALIZATION", self.to_string()),
            Self::Io(_) => ErrorInfo::new("IO", self.to_string()),
        }
    }
}

/// Diagnostic metadata attached to an error.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "CONFIG-PLACEHOLDER").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Renders the summary and the fix hint as one user-facing message.
    #[must_use]
    pub fn render(&self) -> String {
        match &self.fix_hint {
            Some(hint) => format!("{}\n  fix: {}", self.summary, hint),
            None => self.summary.clone(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::Value::String(self.code.clone()));
        map.insert("summary".to_string(), serde_json::Value::String(self.summary.clone()));

        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::Value::String(hint.clone()));
        }
        if !self.context.is_empty() {
            let context_map: serde_json::Map<String, serde_json::Value> = self
                .context
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            map.insert("context".to_string(), serde_json::Value::Object(context_map));
        }

        map
    }
}

/// Raised when the configuration file is absent.
#[derive(Debug, Clone, Error)]
#[error("Configuration file not found: {}", missing.display())]
pub struct MissingConfigError {
    /// The path that does not exist.
    pub missing: PathBuf,
    /// The template the user should copy, when the missing file is the config itself.
    pub template: Option<PathBuf>,
}

impl MissingConfigError {
    /// Creates an error for a missing config that should be copied from `template`.
    #[must_use]
    pub fn new(missing: impl Into<PathBuf>, template: impl Into<PathBuf>) -> Self {
        Self {
            missing: missing.into(),
            template: Some(template.into()),
        }
    }

    /// Creates an error for a missing template.
    #[must_use]
    pub fn template(missing: impl Into<PathBuf>) -> Self {
        Self {
            missing: missing.into(),
            template: None,
        }
    }

    /// Returns the diagnostic info.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        let hint = match &self.template {
            Some(template) => format!(
                "Copy the template and fill in your values: cp {} {}",
                template.display(),
                self.missing.display()
            ),
            None => format!(
                "The configuration template {} is missing; restore it from version control.",
                self.missing.display()
            ),
        };
        ErrorInfo::new("CONFIG-MISSING", self.to_string()).with_fix_hint(hint)
    }
}

/// Raised when configuration values still hold template placeholders.
#[derive(Debug, Clone, Error)]
#[error("Configuration {} still has placeholder values for: {}", path.display(), keys.join(", "))]
pub struct PlaceholderError {
    /// The configuration file.
    pub path: PathBuf,
    /// The offending keys, sorted.
    pub keys: Vec<String>,
}

impl PlaceholderError {
    /// Creates a new placeholder error.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mut keys: Vec<String>) -> Self {
        keys.sort();
        Self {
            path: path.into(),
            keys,
        }
    }

    /// Returns the diagnostic info.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        ErrorInfo::new("CONFIG-PLACEHOLDER", self.to_string()).with_fix_hint(format!(
            "Edit {} and replace the <...> values for: {}",
            self.path.display(),
            self.keys.join(", ")
        ))
    }
}

/// Raised when a key declared in the template is missing from the configuration.
#[derive(Debug, Clone, Error)]
#[error("Configuration {} is missing key '{key}' declared in {}", path.display(), template.display())]
pub struct MissingKeyError {
    /// The configuration file.
    pub path: PathBuf,
    /// The template declaring the key.
    pub template: PathBuf,
    /// The missing key.
    pub key: String,
}

impl MissingKeyError {
    /// Creates a new missing key error.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        template: impl Into<PathBuf>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            template: template.into(),
            key: key.into(),
        }
    }

    /// Returns the diagnostic info.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        ErrorInfo::new("CONFIG-MISSING-KEY", self.to_string()).with_fix_hint(format!(
            "Copy the '{}' entry from {} into {} and set its value.",
            self.key,
            self.template.display(),
            self.path.display()
        ))
    }
}

/// Raised when an output directory cannot be written.
#[derive(Debug, Error)]
#[error("Cannot write to {}: {source}", dir.display())]
pub struct WriteError {
    /// The directory that rejected the write.
    pub dir: PathBuf,
    /// The underlying IO error.
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    /// Creates a new write error.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            dir: dir.into(),
            source,
        }
    }

    /// Returns the diagnostic info.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        ErrorInfo::new("OUTPUT-NOT-WRITABLE", self.to_string()).with_fix_hint(format!(
            "Check that {} exists and that you have write permission.",
            self.dir.display()
        ))
    }
}

/// Raised when a wrapped step fails for one work item.
#[derive(Debug, Clone, Error)]
#[error("Step '{step}' failed for {item}: {message}")]
pub struct StepError {
    /// The step name.
    pub step: String,
    /// The work item label.
    pub item: String,
    /// The error message.
    pub message: String,
}

impl StepError {
    /// Creates a new step error.
    #[must_use]
    pub fn new(
        step: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            step: step.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for provguard results.
pub type Result<T, E = GuardError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_creation() {
        let info = ErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("key", "data_path");

        assert_eq!(info.code, "TEST-001");
        assert_eq!(info.summary, "Test error");
        assert_eq!(info.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(info.context.get("key"), Some(&"data_path".to_string()));
    }

    #[test]
    fn test_error_info_render() {
        let info = ErrorInfo::new("X", "broken").with_fix_hint("mend it");
        assert_eq!(info.render(), "broken\n  fix: mend it");
        assert_eq!(ErrorInfo::new("X", "broken").render(), "broken");
    }

    #[test]
    fn test_missing_config_names_template() {
        let err = GuardError::from(MissingConfigError::new("config.toml", "config.template.toml"));
        let info = err.info();

        assert!(err.is_config_error());
        assert_eq!(info.code, "CONFIG-MISSING");
        let hint = info.fix_hint.unwrap();
        assert!(hint.contains("cp config.template.toml config.toml"));
    }

    #[test]
    fn test_placeholder_error_sorts_keys() {
        let err = PlaceholderError::new(
            "config.toml",
            vec!["env_path".to_string(), "data_path".to_string()],
        );
        assert_eq!(err.keys, vec!["data_path", "env_path"]);
        assert!(err.to_string().contains("data_path, env_path"));
    }

    #[test]
    fn test_missing_key_hint() {
        let err = MissingKeyError::new("config.toml", "config.template.toml", "random_seed");
        let hint = err.info().fix_hint.unwrap();
        assert!(hint.contains("random_seed"));
        assert!(hint.contains("config.template.toml"));
    }

    #[test]
    fn test_step_error_is_not_config_error() {
        let err = GuardError::from(StepError::new("glm", "sub-07", "singular matrix"));
        assert!(!err.is_config_error());
        assert_eq!(err.to_string(), "Step 'glm' failed for sub-07: singular matrix");

        let dict = err.info().to_dict();
        assert_eq!(dict.get("code").unwrap(), "STEP-FAILED");
    }
}

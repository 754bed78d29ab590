//! Typed view of the recognized configuration options.

use std::path::PathBuf;

use super::Configuration;

/// Key holding the data root.
pub const DATA_PATH: &str = "data_path";
/// Key holding the analysis environment path.
pub const ENV_PATH: &str = "env_path";
/// Key holding the logging level.
pub const LOG_LEVEL: &str = "log_level";
/// Key holding the random seed.
pub const RANDOM_SEED: &str = "random_seed";

fn default_log_level() -> String {
    "info".to_string()
}

/// The options every project configuration may set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the data tree (`raw/`, `processed/`, `reports/`).
    pub data_path: Option<PathBuf>,
    /// Path of the analysis environment.
    pub env_path: Option<PathBuf>,
    /// Logging level directive (`info`, `debug`, ...).
    pub log_level: String,
    /// Seed for any randomized procedure.
    pub random_seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: None,
            env_path: None,
            log_level: default_log_level(),
            random_seed: None,
        }
    }
}

impl Settings {
    /// Extracts the recognized options from a configuration.
    ///
    /// Options with an unexpected type are treated as unset.
    #[must_use]
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            data_path: config.get_str(DATA_PATH).map(PathBuf::from),
            env_path: config.get_str(ENV_PATH).map(PathBuf::from),
            log_level: config
                .get_str(LOG_LEVEL)
                .map_or_else(default_log_level, str::to_lowercase),
            random_seed: config.get(RANDOM_SEED).and_then(serde_json::Value::as_u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_settings_from_config() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("t.toml");
        let config = dir.path().join("c.toml");
        fs::write(&template, "data_path = \"<D>\"\n").unwrap();
        fs::write(
            &config,
            "data_path = \"/data\"\nlog_level = \"DEBUG\"\nrandom_seed = 1234\n",
        )
        .unwrap();

        let settings = load(&template, &config).unwrap().settings();
        assert_eq!(settings.data_path, Some(PathBuf::from("/data")));
        assert_eq!(settings.env_path, None);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.random_seed, Some(1234));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert!(settings.random_seed.is_none());
    }

    #[test]
    fn test_negative_seed_is_unset() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("t.toml");
        let config = dir.path().join("c.toml");
        fs::write(&template, "random_seed = 0\n").unwrap();
        fs::write(&config, "random_seed = -5\n").unwrap();

        let settings = load(&template, &config).unwrap().settings();
        assert_eq!(settings.random_seed, None);
    }
}

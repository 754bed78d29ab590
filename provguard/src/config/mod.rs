//! Project configuration: loading, template validation and path resolution.
//!
//! A configuration is loaded once per process from a TOML (or JSON) file
//! and validated against the template it was copied from. It may then be
//! installed in a process-wide slot and is immutable thereafter.

mod placeholder;
mod resolver;
mod settings;

pub use placeholder::{contains_placeholder, is_placeholder, placeholder_keys};
pub use resolver::{load, resolve_path, ConfigResolver, Configuration};
pub use settings::{Settings, DATA_PATH, ENV_PATH, LOG_LEVEL, RANDOM_SEED};

use once_cell::sync::OnceCell;

static GLOBAL_CONFIG: OnceCell<Configuration> = OnceCell::new();

/// Installs the process-wide configuration.
///
/// Returns the configuration back as `Err` if one was already installed.
pub fn init_global(config: Configuration) -> Result<&'static Configuration, Configuration> {
    GLOBAL_CONFIG
        .try_insert(config)
        .map_err(|(_, rejected)| rejected)
}

/// Returns the process-wide configuration, if installed.
pub fn global() -> Option<&'static Configuration> {
    GLOBAL_CONFIG.get()
}

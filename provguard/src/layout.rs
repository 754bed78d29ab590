//! Directory layout contract for analysis projects.
//!
//! ```text
//! <root>/
//!   raw/                      immutable source data
//!   processed/<script>/<subject>[/<session>]/...
//!   reports/
//!     logs/
//! ```
//!
//! Guarded steps may only write below `processed/` and `reports/`.

use std::path::{Component, Path, PathBuf};

use crate::config::{resolve_path, Configuration, DATA_PATH};
use crate::core::WorkItem;
use crate::errors::{GuardError, Result};

const RAW: &str = "raw";
const PROCESSED: &str = "processed";
const REPORTS: &str = "reports";
const LOGS: &str = "logs";

/// The project directory tree rooted at the configured data path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Creates a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a layout rooted at the configuration's `data_path` (default `data`).
    #[must_use]
    pub fn from_config(config: &Configuration) -> Self {
        Self::new(resolve_path(config, DATA_PATH, "data"))
    }

    /// Returns the layout root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the immutable source data directory.
    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW)
    }

    /// Returns the output directory of a script.
    #[must_use]
    pub fn processed_dir(&self, script: &str) -> PathBuf {
        self.root.join(PROCESSED).join(script)
    }

    /// Returns the output directory of a script for one work item.
    #[must_use]
    pub fn item_dir(&self, script: &str, item: &WorkItem) -> PathBuf {
        let mut dir = self.processed_dir(script).join(&item.subject);
        if let Some(session) = &item.session {
            dir.push(session);
        }
        dir
    }

    /// Returns the reports directory.
    #[must_use]
    pub fn reports_dir(&self) -> PathBuf {
        self.root.join(REPORTS)
    }

    /// Returns the directory holding per-run log files.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.reports_dir().join(LOGS)
    }

    /// Checks that `path` is a writable location under the layout.
    ///
    /// Paths are compared lexically; `..` components are rejected outright.
    pub fn check_output(&self, path: &Path) -> Result<()> {
        let violation = || GuardError::LayoutViolation {
            path: path.to_path_buf(),
            root: self.root.clone(),
        };

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(violation());
        }

        let relative = path.strip_prefix(&self.root).map_err(|_| violation())?;
        match relative.components().next() {
            Some(Component::Normal(first)) if first == PROCESSED || first == REPORTS => {
                if relative.components().count() > 1 {
                    Ok(())
                } else {
                    Err(violation())
                }
            }
            _ => Err(violation()),
        }
    }
}

//! A throwaway project tree for tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::guard::{RunGuard, TransitionSink};
use crate::layout::Layout;
use crate::provenance::ProvenanceRecorder;

/// Revision pinned by [`TestProject::guard`].
pub const TEST_REVISION: &str = "0123456789abcdef0123456789abcdef01234567";

/// A project rooted in a caller-provided (usually temporary) directory.
#[derive(Debug, Clone)]
pub struct TestProject {
    root: PathBuf,
    layout: Layout,
}

impl TestProject {
    /// Creates the project with `raw/`, `processed/` and `reports/` under `root`.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let layout = Layout::new(root.join("data"));
        fs::create_dir_all(layout.raw_dir())?;
        fs::create_dir_all(layout.root().join("processed"))?;
        fs::create_dir_all(layout.reports_dir())?;
        Ok(Self { root, layout })
    }

    /// Returns the project root (config files live here).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the data layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Writes `config.template.toml` and returns its path.
    pub fn write_template(&self, contents: &str) -> io::Result<PathBuf> {
        let path = self.root.join("config.template.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Writes `config.toml` and returns its path.
    pub fn write_config(&self, contents: &str) -> io::Result<PathBuf> {
        let path = self.root.join("config.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Returns a recorder with a pinned revision.
    #[must_use]
    pub fn recorder(&self) -> Arc<ProvenanceRecorder> {
        Arc::new(ProvenanceRecorder::new(&self.root).with_revision(TEST_REVISION))
    }

    /// Returns a guard over the project with a pinned revision.
    #[must_use]
    pub fn guard(&self) -> RunGuard {
        RunGuard::new(self.layout.clone(), self.recorder())
    }

    /// Returns a guard reporting transitions to `sink`.
    #[must_use]
    pub fn guard_with_sink(&self, sink: Arc<dyn TransitionSink>) -> RunGuard {
        self.guard().with_sink(sink)
    }
}

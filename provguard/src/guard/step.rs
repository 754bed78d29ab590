//! The unit of guarded work and the context it runs in.

use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::Settings;
use crate::core::WorkItem;
use crate::layout::Layout;
use crate::provenance::Parameters;

/// A script step run once per work item under a [`RunGuard`](super::RunGuard).
///
/// A step declares the outputs it will produce before it runs, so the guard
/// can skip it when they already exist. Outputs should be written through
/// [`StepContext::staging_path`] (or [`StepContext::write_output`]); the
/// guard moves them into place once the step returns successfully.
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Returns the step (script) name. Used for `processed/<name>/` and in
    /// provenance records.
    fn name(&self) -> &str;

    /// Returns the final paths this step produces for `item`.
    fn outputs(&self, item: &WorkItem, layout: &Layout) -> Vec<PathBuf>;

    /// Returns the parameters recorded in the provenance of `item`'s outputs.
    fn parameters(&self, _item: &WorkItem) -> Parameters {
        Parameters::new()
    }

    /// Returns a human description for provenance records.
    fn description(&self) -> Option<String> {
        None
    }

    /// Runs the step.
    async fn execute(&self, ctx: &StepContext) -> anyhow::Result<()>;
}

/// Returns the staging path of an output: a hidden `.partial` file beside it.
#[must_use]
pub fn staging_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".{name}.partial"))
}

/// Everything a step needs to process one work item.
#[derive(Debug, Clone)]
pub struct StepContext {
    step: String,
    item: WorkItem,
    layout: Layout,
    parameters: Parameters,
    outputs: Vec<PathBuf>,
    settings: Settings,
}

impl StepContext {
    /// Creates a context.
    #[must_use]
    pub fn new(
        step: impl Into<String>,
        item: WorkItem,
        layout: Layout,
        parameters: Parameters,
        outputs: Vec<PathBuf>,
        settings: Settings,
    ) -> Self {
        Self {
            step: step.into(),
            item,
            layout,
            parameters,
            outputs,
            settings,
        }
    }

    /// Returns the step name.
    #[must_use]
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Returns the work item.
    #[must_use]
    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    /// Returns the project layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Returns the parameters recorded for this invocation.
    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Returns a single parameter.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&serde_json::Value> {
        self.parameters.get(key)
    }

    /// Returns the configured settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the declared final output paths.
    #[must_use]
    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    /// Returns the declared output at `index`.
    #[must_use]
    pub fn output(&self, index: usize) -> Option<&Path> {
        self.outputs.get(index).map(PathBuf::as_path)
    }

    /// Returns this step's directory for the current item.
    #[must_use]
    pub fn item_dir(&self) -> PathBuf {
        self.layout.item_dir(&self.step, &self.item)
    }

    /// Returns where `output` should be written while the step runs.
    #[must_use]
    pub fn staging_path(&self, output: &Path) -> PathBuf {
        staging_path(output)
    }

    /// Writes `contents` to the staging path of `output`.
    pub async fn write_output(&self, output: &Path, contents: &[u8]) -> std::io::Result<PathBuf> {
        let staged = staging_path(output);
        if let Some(dir) = staged.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&staged, contents).await?;
        Ok(staged)
    }
}

/// A step built from a closure.
///
/// Outputs are file names under `processed/<name>/<subject>[/<session>]/`.
pub struct FnStep<F>
where
    F: Fn(&StepContext) -> anyhow::Result<()> + Send + Sync,
{
    name: String,
    files: Vec<String>,
    parameters: Parameters,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&StepContext) -> anyhow::Result<()> + Send + Sync,
{
    /// Creates a step producing `files` in each item's directory.
    pub fn new<I, S>(name: impl Into<String>, files: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            files: files.into_iter().map(Into::into).collect(),
            parameters: Parameters::new(),
            func,
        }
    }

    /// Adds a parameter recorded for every item.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

impl<F> Debug for FnStep<F>
where
    F: Fn(&StepContext) -> anyhow::Result<()> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(&StepContext) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn outputs(&self, item: &WorkItem, layout: &Layout) -> Vec<PathBuf> {
        let dir = layout.item_dir(&self.name, item);
        self.files.iter().map(|file| dir.join(file)).collect()
    }

    fn parameters(&self, _item: &WorkItem) -> Parameters {
        self.parameters.clone()
    }

    async fn execute(&self, ctx: &StepContext) -> anyhow::Result<()> {
        (self.func)(ctx)
    }
}

//! Mock steps for testing guarded runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::WorkItem;
use crate::guard::{Step, StepContext};
use crate::layout::Layout;
use crate::provenance::Parameters;

/// A step that writes fixed contents to each declared file.
///
/// Records every item it runs for and can be told to fail for some subjects.
#[derive(Debug)]
pub struct MockStep {
    name: String,
    files: Vec<String>,
    contents: String,
    parameters: Parameters,
    fail_for: BTreeSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockStep {
    /// Creates a step writing `files` into each item's directory.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            files: files.into_iter().map(Into::into).collect(),
            contents: "mock output".to_string(),
            parameters: Parameters::new(),
            fail_for: BTreeSet::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the contents written to every file.
    #[must_use]
    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = contents.into();
        self
    }

    /// Adds a recorded parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Makes the step return an error for `subject`.
    #[must_use]
    pub fn failing_for(mut self, subject: impl Into<String>) -> Self {
        self.fail_for.insert(subject.into());
        self
    }

    /// Sleeps before writing.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns how many times the step executed.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the labels of the items the step executed for.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Step for MockStep {
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
        self.calls.lock().push(ctx.item().label());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        for output in ctx.outputs() {
            ctx.write_output(output, self.contents.as_bytes()).await?;
        }
        if self.fail_for.contains(&ctx.item().subject) {
            anyhow::bail!("mock failure for {}", ctx.item());
        }
        Ok(())
    }
}

/// A step that panics after staging its output.
#[derive(Debug)]
pub struct PanickingStep {
    name: String,
    message: String,
}

impl PanickingStep {
    /// Creates a step that panics with `message`.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Step for PanickingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn outputs(&self, item: &WorkItem, layout: &Layout) -> Vec<PathBuf> {
        vec![layout.item_dir(&self.name, item).join("result.csv")]
    }

    async fn execute(&self, ctx: &StepContext) -> anyhow::Result<()> {
        for output in ctx.outputs() {
            ctx.write_output(output, b"partial").await?;
        }
        panic!("{}", self.message);
    }
}

/// A step that declares outputs at fixed paths and writes nothing.
#[derive(Debug)]
pub struct SilentStep {
    name: String,
    outputs: Vec<PathBuf>,
}

impl SilentStep {
    /// Creates a step declaring `outputs` verbatim.
    #[must_use]
    pub fn new(name: impl Into<String>, outputs: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            outputs,
        }
    }
}

#[async_trait]
impl Step for SilentStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn outputs(&self, _item: &WorkItem, _layout: &Layout) -> Vec<PathBuf> {
        self.outputs.clone()
    }

    async fn execute(&self, _ctx: &StepContext) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn context(root: &std::path::Path, step: &dyn Step, subject: &str) -> StepContext {
        let layout = Layout::new(root);
        let item = WorkItem::new(subject);
        let outputs = step.outputs(&item, &layout);
        StepContext::new(
            step.name(),
            item,
            layout,
            Parameters::new(),
            outputs,
            Settings::default(),
        )
    }

    #[test]
    fn test_mock_step_records_calls() {
        let dir = tempfile::tempdir().unwrap();
        let step = MockStep::new("glm", ["beta.csv"]).failing_for("sub-02");

        tokio_test::block_on(async {
            assert!(step.execute(&context(dir.path(), &step, "sub-01")).await.is_ok());
            assert!(step.execute(&context(dir.path(), &step, "sub-02")).await.is_err());
        });

        assert_eq!(step.calls(), vec!["sub-01", "sub-02"]);
        assert_eq!(step.call_count(), 2);
    }

    #[test]
    fn test_silent_step_declares_fixed_outputs() {
        let step = SilentStep::new("noop", vec![PathBuf::from("/d/processed/noop/x.csv")]);
        let outputs = step.outputs(&WorkItem::new("sub-01"), &Layout::new("/other"));
        assert_eq!(outputs, vec![PathBuf::from("/d/processed/noop/x.csv")]);
    }
}

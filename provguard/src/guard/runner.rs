//! The run guard: skip-if-exists, staged execution and provenance.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use futures::FutureExt;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn, Level};

use super::sink::{NoOpTransitionSink, TransitionSink};
use super::step::{staging_path, Step, StepContext};
use crate::config::{Configuration, Settings};
use crate::core::{FailureKind, RunResult, RunState, Transition, WorkItem};
use crate::errors::StepError;
use crate::layout::Layout;
use crate::observability::SpanTimer;
use crate::provenance::{sidecar_path_among, ProvenanceRecorder};

/// Everything that happened during one guarded invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Step name.
    pub step: String,
    /// The work item.
    pub item: WorkItem,
    /// The outcome.
    pub result: RunResult,
    /// Every state transition, in order.
    pub transitions: Vec<Transition>,
    /// Sidecars written on success.
    pub sidecars: Vec<PathBuf>,
    /// Wall-clock duration.
    pub duration_ms: u64,
}

impl RunReport {
    /// Returns the final state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.result.state()
    }

    /// Returns the sequence of states entered.
    #[must_use]
    pub fn states(&self) -> Vec<RunState> {
        self.transitions.iter().map(|t| t.to).collect()
    }
}

/// Wraps a step invocation with the config, layout and provenance checks.
///
/// One guard serves any number of invocations, concurrently if needed.
pub struct RunGuard {
    layout: Layout,
    recorder: Arc<ProvenanceRecorder>,
    settings: Settings,
    force: bool,
    sink: Arc<dyn TransitionSink>,
}

impl fmt::Debug for RunGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunGuard")
            .field("layout", &self.layout)
            .field("recorder", &self.recorder)
            .field("force", &self.force)
            .finish_non_exhaustive()
    }
}

impl RunGuard {
    /// Creates a guard over `layout` recording provenance with `recorder`.
    #[must_use]
    pub fn new(layout: Layout, recorder: Arc<ProvenanceRecorder>) -> Self {
        Self {
            layout,
            recorder,
            settings: Settings::default(),
            force: false,
            sink: Arc::new(NoOpTransitionSink),
        }
    }

    /// Creates a guard from a loaded configuration, reading the git revision
    /// of the current directory.
    #[must_use]
    pub fn from_config(config: &Configuration) -> Self {
        Self::new(Layout::from_config(config), Arc::new(ProvenanceRecorder::default()))
            .with_settings(config.settings())
    }

    /// Sets the settings passed to steps.
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Recomputes outputs even when they already exist.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sends every transition to `sink` as well as the log.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TransitionSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Returns the provenance recorder.
    #[must_use]
    pub fn recorder(&self) -> &ProvenanceRecorder {
        &self.recorder
    }

    /// Returns true if existing outputs are recomputed.
    #[must_use]
    pub const fn force(&self) -> bool {
        self.force
    }

    /// Runs `step` for `item`.
    ///
    /// Never returns an error: every failure is reported in the result.
    pub async fn run(&self, step: &dyn Step, item: &WorkItem) -> RunReport {
        let timer = SpanTimer::start(format!("{}[{item}]", step.name()));
        let mut tracker = Tracker::new(step.name(), item, self.sink.as_ref());
        let mut sidecars = Vec::new();

        let result = self.guarded(step, item, &mut tracker, &mut sidecars).await;

        RunReport {
            step: step.name().to_string(),
            item: item.clone(),
            result,
            transitions: tracker.transitions,
            sidecars,
            duration_ms: timer.finish(),
        }
    }

    async fn guarded(
        &self,
        step: &dyn Step,
        item: &WorkItem,
        tracker: &mut Tracker<'_>,
        sidecars: &mut Vec<PathBuf>,
    ) -> RunResult {
        tracker.advance(RunState::Checking, &[]);
        let outputs = step.outputs(item, &self.layout);
        let step_error =
            |message: String| StepError::new(step.name(), item.label(), message).to_string();

        for output in &outputs {
            if let Err(e) = self.layout.check_output(output) {
                return tracker.fail(FailureKind::LayoutViolation, step_error(e.to_string()));
            }
        }

        if !self.force && !outputs.is_empty() && all_recorded(&outputs) {
            let reason = format!("all {} outputs and their sidecars already exist", outputs.len());
            tracker.advance(RunState::Skipped, &[("reason", json!(reason))]);
            return RunResult::skipped(reason);
        }

        discard_staged(&outputs);
        let before = modified_times(&outputs);
        tracker.advance(
            RunState::Running,
            &[("outputs", json!(outputs.len())), ("force", json!(self.force))],
        );

        let parameters = step.parameters(item);
        let ctx = StepContext::new(
            step.name(),
            item.clone(),
            self.layout.clone(),
            parameters.clone(),
            outputs.clone(),
            self.settings.clone(),
        );

        match AssertUnwindSafe(step.execute(&ctx)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                discard_touched(&outputs, &before);
                return tracker.fail(FailureKind::Step, step_error(format!("{e:#}")));
            }
            Err(payload) => {
                discard_touched(&outputs, &before);
                let message = format!("panicked: {}", panic_message(payload.as_ref()));
                return tracker.fail(FailureKind::Panic, step_error(message));
            }
        }

        let missing: Vec<String> = outputs
            .iter()
            .filter(|o| !staging_path(o).exists() && !o.exists())
            .map(|o| o.display().to_string())
            .collect();
        if !missing.is_empty() {
            discard_touched(&outputs, &before);
            let message = format!("did not produce {}", missing.join(", "));
            return tracker.fail(FailureKind::MissingOutput, step_error(message));
        }

        if let Err(e) = promote(&outputs) {
            discard_touched(&outputs, &before);
            let message = format!("could not move outputs into place: {e}");
            return tracker.fail(FailureKind::Io, step_error(message));
        }

        let mut record = self.recorder.capture(step.name(), parameters);
        if let Some(description) = step.description() {
            record = record.with_description(description);
        }

        let mut written = BTreeSet::new();
        for output in &outputs {
            if !written.insert(sidecar_path_among(output, &outputs)) {
                continue;
            }
            match self.recorder.write_sidecar_among(&record, output, &outputs) {
                Ok(path) => {
                    debug!(sidecar = %path.display(), "Wrote provenance sidecar");
                    sidecars.push(path);
                }
                Err(e) => {
                    retract(&outputs, sidecars);
                    return tracker.fail(FailureKind::Provenance, step_error(e.info().render()));
                }
            }
        }

        tracker.advance(
            RunState::Succeeded,
            &[("outputs", json!(outputs.len())), ("git_commit", json!(record.git_commit))],
        );
        RunResult::success(outputs)
    }
}

/// Records transitions for one invocation, logging each as it happens.
struct Tracker<'a> {
    step: &'a str,
    item: String,
    state: RunState,
    sink: &'a dyn TransitionSink,
    transitions: Vec<Transition>,
}

impl<'a> Tracker<'a> {
    fn new(step: &'a str, item: &WorkItem, sink: &'a dyn TransitionSink) -> Self {
        Self {
            step,
            item: item.label(),
            state: RunState::Pending,
            sink,
            transitions: Vec::new(),
        }
    }

    fn advance(&mut self, to: RunState, detail: &[(&str, serde_json::Value)]) {
        debug_assert!(self.state.can_transition_to(to), "{} -> {to}", self.state);

        let mut transition = Transition::new(self.step, self.item.as_str(), self.state, to);
        for (key, value) in detail {
            transition = transition.add_detail(*key, value.clone());
        }

        let from = self.state;
        let detail = &transition.detail;
        match to.log_level() {
            Level::ERROR => error!(step = self.step, item = %self.item, %from, %to, ?detail, "Run failed"),
            Level::WARN => warn!(step = self.step, item = %self.item, %from, %to, ?detail, "Run skipped"),
            _ => info!(step = self.step, item = %self.item, %from, %to, ?detail, "Run state changed"),
        }

        self.sink.on_transition(&transition);
        self.transitions.push(transition);
        self.state = to;
    }

    fn fail(&mut self, kind: FailureKind, message: String) -> RunResult {
        self.advance(
            RunState::Failed,
            &[("kind", json!(kind.to_string())), ("error", json!(message))],
        );
        RunResult::failed(kind, message)
    }
}

/// Removes staging files left behind by this or an earlier, killed run.
fn discard_staged(outputs: &[PathBuf]) {
    for output in outputs {
        let staged = staging_path(output);
        match fs::remove_file(&staged) {
            Ok(()) => debug!(path = %staged.display(), "Discarded staged output"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %staged.display(), error = %e, "Could not discard staged output"),
        }
    }
}

/// Records when each output was last modified, `None` if it is absent.
fn modified_times(outputs: &[PathBuf]) -> Vec<Option<SystemTime>> {
    outputs
        .iter()
        .map(|o| fs::metadata(o).and_then(|m| m.modified()).ok())
        .collect()
}

/// Removes staged files and every final output created or rewritten since
/// `before` was taken, so a failed run leaves nothing half-written in place.
fn discard_touched(outputs: &[PathBuf], before: &[Option<SystemTime>]) {
    discard_staged(outputs);
    for (output, then) in outputs.iter().zip(before) {
        let now = fs::metadata(output).and_then(|m| m.modified()).ok();
        if now.is_none() || now == *then {
            continue;
        }
        match fs::remove_file(output) {
            Ok(()) => debug!(path = %output.display(), "Discarded output of failed run"),
            Err(e) => warn!(path = %output.display(), error = %e, "Could not discard output of failed run"),
        }
    }
}

/// Moves staged outputs to their final paths.
///
/// Outputs the step wrote in place are left as they are.
fn promote(outputs: &[PathBuf]) -> io::Result<()> {
    for output in outputs {
        let staged = staging_path(output);
        if staged.exists() {
            fs::rename(&staged, output)?;
        }
    }
    Ok(())
}

/// Removes outputs and sidecars of a run whose provenance could not be
/// completed, so the next run recomputes them instead of skipping.
fn retract(outputs: &[PathBuf], sidecars: &mut Vec<PathBuf>) {
    for path in outputs.iter().chain(sidecars.iter()) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Could not remove unrecorded output");
            }
        }
    }
    sidecars.clear();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn all_exist(paths: &[impl AsRef<Path>]) -> bool {
    paths.iter().all(|p| p.as_ref().exists())
}

/// Returns true if every output and its sidecar exist.
fn all_recorded(outputs: &[PathBuf]) -> bool {
    all_exist(outputs) && outputs.iter().all(|o| sidecar_path_among(o, outputs).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::FnStep;

    fn guard(root: &Path) -> RunGuard {
        RunGuard::new(
            Layout::new(root),
            Arc::new(ProvenanceRecorder::new(root).with_revision("abc123")),
        )
    }

    #[tokio::test]
    async fn test_run_success_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        let step = FnStep::new("glm", ["beta.csv"], |ctx| {
            let staged = ctx.staging_path(&ctx.outputs()[0]);
            fs::create_dir_all(staged.parent().unwrap())?;
            fs::write(staged, "b")?;
            Ok(())
        });

        let report = guard.run(&step, &WorkItem::new("sub-01")).await;

        assert!(report.result.is_success());
        assert_eq!(
            report.states(),
            vec![RunState::Checking, RunState::Running, RunState::Succeeded]
        );
        assert_eq!(report.sidecars.len(), 1);
    }

    #[tokio::test]
    async fn test_step_without_outputs_always_runs() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        let step = FnStep::new("notify", Vec::<String>::new(), |_ctx| Ok(()));

        for _ in 0..2 {
            let report = guard.run(&step, &WorkItem::new("sub-01")).await;
            assert!(report.result.is_success());
            assert!(report.sidecars.is_empty());
        }
    }

    #[tokio::test]
    async fn test_outputs_sharing_a_base_share_a_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        let step = FnStep::new("reg", ["sub-01_T1w.nii.gz", "sub-01_T1w.mat"], |ctx| {
            for output in ctx.outputs() {
                let staged = ctx.staging_path(output);
                fs::create_dir_all(staged.parent().unwrap())?;
                fs::write(staged, "x")?;
            }
            Ok(())
        });

        let report = guard.run(&step, &WorkItem::new("sub-01")).await;

        assert!(report.result.is_success());
        assert_eq!(report.sidecars.len(), 1);
        assert!(report.sidecars[0].ends_with("sub-01_T1w.json"));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_promote_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        fs::write(staging_path(&a), "a").unwrap();
        fs::write(&b, "in place").unwrap();

        promote(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(fs::read_to_string(&a).unwrap(), "a");
        assert_eq!(fs::read_to_string(&b).unwrap(), "in place");
        assert!(all_exist(&[&a, &b]));

        fs::write(staging_path(&a), "stale").unwrap();
        discard_staged(&[a.clone()]);
        assert!(!staging_path(&a).exists());
    }
}

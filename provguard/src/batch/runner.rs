//! Bounded-parallel execution of a step over work items.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use super::summary::BatchSummary;
use crate::core::{FailureKind, RunResult, WorkItem};
use crate::guard::{RunGuard, RunReport, Step};
use crate::observability::SpanTimer;

/// Runs one guarded invocation per work item.
///
/// Item failures never stop the other items.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    guard: Arc<RunGuard>,
    max_parallel: usize,
}

impl BatchRunner {
    /// Creates a runner using up to one task per available CPU.
    #[must_use]
    pub fn new(guard: Arc<RunGuard>) -> Self {
        let max_parallel = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self { guard, max_parallel }
    }

    /// Limits how many items run at once (at least one).
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Returns the parallelism limit.
    #[must_use]
    pub const fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Returns the guard each item runs under.
    #[must_use]
    pub fn guard(&self) -> &RunGuard {
        &self.guard
    }

    /// Runs `step` for every item and returns their outcomes in input order.
    pub async fn run<I>(&self, step: Arc<dyn Step>, items: I) -> BatchSummary
    where
        I: IntoIterator<Item = WorkItem>,
    {
        let items: Vec<WorkItem> = items.into_iter().collect();
        let timer = SpanTimer::start(format!("batch {}", step.name()));
        info!(
            step = step.name(),
            items = items.len(),
            max_parallel = self.max_parallel,
            force = self.guard.force(),
            "Batch started"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();
        for (index, item) in items.iter().cloned().enumerate() {
            let guard = Arc::clone(&self.guard);
            let step = Arc::clone(&step);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, guard.run(step.as_ref(), &item).await)
            });
        }

        let mut slots: Vec<Option<RunReport>> = vec![None; items.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => slots[index] = Some(report),
                Err(e) => error!(step = step.name(), error = %e, "Batch task aborted"),
            }
        }

        let reports = slots
            .into_iter()
            .zip(items)
            .map(|(slot, item)| slot.unwrap_or_else(|| aborted(step.name(), item)))
            .collect();

        let summary = BatchSummary::new(step.name(), reports, timer.finish());
        summary.log();
        summary
    }
}

fn aborted(step: &str, item: WorkItem) -> RunReport {
    RunReport {
        step: step.to_string(),
        item,
        result: RunResult::failed(FailureKind::Panic, "batch task aborted before reporting"),
        transitions: Vec::new(),
        sidecars: Vec::new(),
        duration_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockStep, TestProject};
    use std::time::Duration;

    #[test]
    fn test_max_parallel_is_at_least_one() {
        let dir = tempfile::tempdir().unwrap();
        let project = TestProject::new(dir.path()).unwrap();
        let runner = BatchRunner::new(Arc::new(project.guard())).with_max_parallel(0);
        assert_eq!(runner.max_parallel(), 1);
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let project = TestProject::new(dir.path()).unwrap();
        let runner = BatchRunner::new(Arc::new(project.guard())).with_max_parallel(3);
        let step = Arc::new(MockStep::new("glm", ["beta.csv"]).with_delay(Duration::from_millis(5)));

        let items: Vec<WorkItem> = ["sub-03", "sub-01", "sub-02", "sub-05", "sub-04"]
            .into_iter()
            .map(WorkItem::from)
            .collect();
        let summary = runner.run(step.clone(), items.clone()).await;

        let order: Vec<WorkItem> = summary.reports.iter().map(|r| r.item.clone()).collect();
        assert_eq!(order, items);
        assert_eq!(summary.succeeded(), 5);
        assert_eq!(step.call_count(), 5);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let project = TestProject::new(dir.path()).unwrap();
        let runner = BatchRunner::new(Arc::new(project.guard()));
        let summary = runner.run(Arc::new(MockStep::new("glm", ["beta.csv"])), Vec::new()).await;
        assert_eq!(summary.total(), 0);
    }
}

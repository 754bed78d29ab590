//! Per-batch outcome reporting.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::core::{FailureKind, RunResult};
use crate::guard::RunReport;

/// One failed item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Work item label.
    pub item: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Error message.
    pub message: String,
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Step name.
    pub step: String,
    /// One report per item, in input order.
    pub reports: Vec<RunReport>,
    /// Wall-clock duration of the whole batch.
    pub duration_ms: u64,
}

impl BatchSummary {
    /// Creates a summary.
    #[must_use]
    pub fn new(step: impl Into<String>, reports: Vec<RunReport>, duration_ms: u64) -> Self {
        Self {
            step: step.into(),
            reports,
            duration_ms,
        }
    }

    /// Returns the number of items.
    #[must_use]
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    /// Returns the number of items that ran and succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_success()).count()
    }

    /// Returns the number of items skipped because their outputs existed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_skipped()).count()
    }

    /// Returns the number of failed items.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_failure()).count()
    }

    /// Returns true if any item failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Returns a record for each failed item.
    #[must_use]
    pub fn failures(&self) -> Vec<FailureRecord> {
        self.reports
            .iter()
            .filter_map(|r| match &r.result {
                RunResult::Failed { kind, message } => Some(FailureRecord {
                    item: r.item.label(),
                    kind: *kind,
                    message: message.clone(),
                }),
                RunResult::Success { .. } | RunResult::Skipped { .. } => None,
            })
            .collect()
    }

    /// Returns the share of items that did not fail (0.0 for an empty batch).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.reports.is_empty() {
            return 0.0;
        }
        (self.total() - self.failed()) as f64 / self.total() as f64
    }

    /// Converts to dictionary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("step".to_string(), serde_json::json!(self.step));
        map.insert("total".to_string(), serde_json::json!(self.total()));
        map.insert("succeeded".to_string(), serde_json::json!(self.succeeded()));
        map.insert("skipped".to_string(), serde_json::json!(self.skipped()));
        map.insert("failed".to_string(), serde_json::json!(self.failed()));
        map.insert("success_rate".to_string(), serde_json::json!(self.success_rate()));
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map.insert("failures".to_string(), serde_json::json!(self.failures()));
        map
    }

    /// Emits the end-of-batch summary line.
    pub fn log(&self) {
        if self.has_failures() {
            let failed_items: Vec<String> = self.failures().into_iter().map(|f| f.item).collect();
            warn!(
                step = %self.step,
                total = self.total(),
                succeeded = self.succeeded(),
                skipped = self.skipped(),
                failed = self.failed(),
                failed_items = ?failed_items,
                duration_ms = self.duration_ms,
                "Batch finished with failures"
            );
        } else {
            info!(
                step = %self.step,
                total = self.total(),
                succeeded = self.succeeded(),
                skipped = self.skipped(),
                duration_ms = self.duration_ms,
                "Batch finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WorkItem;
    use std::path::PathBuf;

    fn report(subject: &str, result: RunResult) -> RunReport {
        RunReport {
            step: "glm".to_string(),
            item: WorkItem::new(subject),
            result,
            transitions: Vec::new(),
            sidecars: Vec::new(),
            duration_ms: 1,
        }
    }

    #[test]
    fn test_counts_and_failures() {
        let summary = BatchSummary::new(
            "glm",
            vec![
                report("sub-01", RunResult::success(vec![PathBuf::from("a")])),
                report("sub-02", RunResult::skipped("exists")),
                report("sub-03", RunResult::failed(FailureKind::Step, "boom")),
                report("sub-04", RunResult::success(Vec::new())),
            ],
            10,
        );

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.failed(), 1);
        assert!((summary.success_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(
            summary.failures(),
            vec![FailureRecord {
                item: "sub-03".to_string(),
                kind: FailureKind::Step,
                message: "boom".to_string(),
            }]
        );

        let dict = summary.to_dict();
        assert_eq!(dict["failed"], serde_json::json!(1));
        assert_eq!(dict["failures"][0]["kind"], "step");
        summary.log();
    }

    #[test]
    fn test_empty_batch() {
        let summary = BatchSummary::new("glm", Vec::new(), 0);
        assert!(summary.success_rate().abs() < f64::EPSILON);
        assert!(!summary.has_failures());
    }
}

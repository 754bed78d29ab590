//! Assertions over guarded runs and their sidecars.

use std::path::Path;

use crate::core::{FailureKind, RunState};
use crate::guard::RunReport;
use crate::provenance::{read_sidecar, sidecar_path, Parameters, ProvenanceRecord};

/// Asserts that the run succeeded.
pub fn assert_succeeded(report: &RunReport) {
    assert!(
        report.result.is_success(),
        "Expected {} [{}] to succeed, got {:?}",
        report.step,
        report.item,
        report.result
    );
}

/// Asserts that the run was skipped.
pub fn assert_skipped(report: &RunReport) {
    assert!(
        report.result.is_skipped(),
        "Expected {} [{}] to be skipped, got {:?}",
        report.step,
        report.item,
        report.result
    );
}

/// Asserts that the run failed with `kind`.
pub fn assert_failed(report: &RunReport, kind: FailureKind) {
    assert_eq!(
        report.result.failure_kind(),
        Some(kind),
        "Expected {} [{}] to fail with {kind}, got {:?}",
        report.step,
        report.item,
        report.result
    );
}

/// Asserts the exact sequence of states entered.
pub fn assert_states(report: &RunReport, expected: &[RunState]) {
    assert_eq!(report.states(), expected, "Unexpected transitions for {}", report.item);
}

/// Asserts that `output` has a sidecar with the given revision and parameters,
/// and returns it.
pub fn assert_sidecar_matches(
    output: &Path,
    git_commit: &str,
    parameters: &Parameters,
) -> ProvenanceRecord {
    let path = sidecar_path(output);
    let record = match read_sidecar(&path) {
        Ok(record) => record,
        Err(e) => panic!("Expected a sidecar at {}: {e}", path.display()),
    };
    assert_eq!(record.git_commit, git_commit, "git_commit of {}", path.display());
    assert_eq!(&record.parameters, parameters, "parameters of {}", path.display());
    record
}

/// Asserts that `output` has no sidecar.
pub fn assert_no_sidecar(output: &Path) {
    let path = sidecar_path(output);
    assert!(!path.exists(), "Unexpected sidecar at {}", path.display());
}

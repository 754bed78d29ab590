//! Outcome of one guarded invocation.

use super::RunState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Why a guarded invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The step returned an error.
    Step,
    /// The step panicked.
    Panic,
    /// The step succeeded but a declared output was never produced.
    MissingOutput,
    /// A declared output lies outside `processed/` and `reports/`.
    LayoutViolation,
    /// The provenance sidecar could not be written.
    Provenance,
    /// Staged outputs could not be moved into place.
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step => write!(f, "step"),
            Self::Panic => write!(f, "panic"),
            Self::MissingOutput => write!(f, "missing_output"),
            Self::LayoutViolation => write!(f, "layout_violation"),
            Self::Provenance => write!(f, "provenance"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// The result of a guarded invocation.
///
/// Callers aggregate these per item; a failure never propagates as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    /// The step ran and its outputs are in place.
    Success {
        /// Final paths of the declared outputs.
        outputs: Vec<PathBuf>,
    },
    /// The outputs already existed.
    Skipped {
        /// Why nothing was recomputed.
        reason: String,
    },
    /// The invocation failed.
    Failed {
        /// The failure category.
        kind: FailureKind,
        /// Error message, including the step identity.
        message: String,
    },
}

impl RunResult {
    /// Creates a success result.
    #[must_use]
    pub fn success(outputs: Vec<PathBuf>) -> Self {
        Self::Success { outputs }
    }

    /// Creates a skipped result.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    /// Returns the terminal state this result corresponds to.
    #[must_use]
    pub fn state(&self) -> RunState {
        match self {
            Self::Success { .. } => RunState::Succeeded,
            Self::Skipped { .. } => RunState::Skipped,
            Self::Failed { .. } => RunState::Failed,
        }
    }

    /// Returns true if the step ran successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true if the invocation was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Returns true if the invocation failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the produced outputs (empty unless successful).
    #[must_use]
    pub fn outputs(&self) -> &[PathBuf] {
        match self {
            Self::Success { outputs } => outputs,
            _ => &[],
        }
    }

    /// Returns the failure kind, if failed.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns the failure message or skip reason.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Skipped { reason } => Some(reason),
            Self::Failed { message, .. } => Some(message),
        }
    }

    /// Converts the result to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("status".to_string(), serde_json::json!(self.state().to_string()));

        match self {
            Self::Success { outputs } => {
                map.insert(
                    "outputs".to_string(),
                    serde_json::json!(outputs
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()),
                );
            }
            Self::Skipped { reason } => {
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::Failed { kind, message } => {
                map.insert("kind".to_string(), serde_json::json!(kind.to_string()));
                map.insert("message".to_string(), serde_json::json!(message));
            }
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result = RunResult::success(vec![PathBuf::from("/d/processed/x/a.csv")]);
        assert!(result.is_success());
        assert_eq!(result.state(), RunState::Succeeded);
        assert_eq!(result.outputs().len(), 1);
        assert!(result.message().is_none());
    }

    #[test]
    fn test_skipped_result() {
        let result = RunResult::skipped("outputs exist");
        assert!(result.is_skipped());
        assert_eq!(result.state(), RunState::Skipped);
        assert!(result.outputs().is_empty());
        assert_eq!(result.message(), Some("outputs exist"));
    }

    #[test]
    fn test_failed_result() {
        let result = RunResult::failed(FailureKind::Panic, "boom");
        assert!(result.is_failure());
        assert_eq!(result.failure_kind(), Some(FailureKind::Panic));
        assert_eq!(result.message(), Some("boom"));
    }

    #[test]
    fn test_tagged_serialization() {
        let result = RunResult::failed(FailureKind::MissingOutput, "no beta.csv");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "failed", "kind": "missing_output", "message": "no beta.csv"})
        );
    }
}

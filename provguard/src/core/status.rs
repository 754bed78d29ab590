//! Run state machine for guarded invocations.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::Level;

/// The state of one guarded invocation.
///
/// ```text
/// Pending -> Checking -> Skipped
///                     -> Running -> Succeeded
///                                -> Failed
///         Checking   -> Failed   (layout violation)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Invocation created, nothing checked yet.
    Pending,
    /// Validating declared outputs and looking for existing results.
    Checking,
    /// Outputs already exist; nothing was recomputed.
    Skipped,
    /// The wrapped step is executing.
    Running,
    /// The step completed and provenance was recorded.
    Succeeded,
    /// The step (or recording its provenance) failed.
    Failed,
}

impl Default for RunState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Checking => write!(f, "checking"),
            Self::Skipped => write!(f, "skipped"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl RunState {
    /// Returns true if the state ends the invocation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped | Self::Succeeded | Self::Failed)
    }

    /// Returns true if the state machine allows moving from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Checking)
                | (Self::Checking, Self::Skipped | Self::Running | Self::Failed)
                | (Self::Running, Self::Succeeded | Self::Failed)
        )
    }

    /// Returns the log level used when entering this state.
    #[must_use]
    pub fn log_level(&self) -> Level {
        match self {
            Self::Skipped => Level::WARN,
            Self::Failed => Level::ERROR,
            Self::Pending | Self::Checking | Self::Running | Self::Succeeded => Level::INFO,
        }
    }
}

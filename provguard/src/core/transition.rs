//! Transition events emitted by the run guard.

use super::RunState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A state change of one guarded invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Step name.
    pub step: String,
    /// Work item label.
    pub item: String,
    /// State left.
    pub from: RunState,
    /// State entered.
    pub to: RunState,
    /// When the transition happened (ISO 8601).
    pub timestamp: String,
    /// Extra detail (skip reason, error message, output count, ...).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub detail: HashMap<String, serde_json::Value>,
}

impl Transition {
    /// Creates a new transition stamped with the current time.
    #[must_use]
    pub fn new(
        step: impl Into<String>,
        item: impl Into<String>,
        from: RunState,
        to: RunState,
    ) -> Self {
        Self {
            step: step.into(),
            item: item.into(),
            from,
            to,
            timestamp: crate::utils::iso_timestamp(),
            detail: HashMap::new(),
        }
    }

    /// Adds a detail field.
    #[must_use]
    pub fn add_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.detail.insert(key.into(), value);
        self
    }

    /// Returns a detail field.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.detail.get(key)
    }
}

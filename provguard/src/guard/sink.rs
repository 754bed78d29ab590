//! Observers of run state transitions.

use crate::core::{RunState, Transition};

/// Receives every transition made by a [`RunGuard`](super::RunGuard).
///
/// Called synchronously from the guard; implementations must not block.
pub trait TransitionSink: Send + Sync {
    /// Handles one transition.
    fn on_transition(&self, transition: &Transition);
}

/// Discards transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTransitionSink;

impl TransitionSink for NoOpTransitionSink {
    fn on_transition(&self, _transition: &Transition) {}
}

/// Keeps every transition in memory.
#[derive(Debug, Default)]
pub struct CollectingTransitionSink {
    transitions: parking_lot::RwLock<Vec<Transition>>,
}

impl CollectingTransitionSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected transitions.
    #[must_use]
    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions.read().clone()
    }

    /// Returns the number of collected transitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.read().is_empty()
    }

    /// Clears the collected transitions.
    pub fn clear(&self) {
        self.transitions.write().clear();
    }

    /// Returns the states entered for one item, in order.
    #[must_use]
    pub fn states_for(&self, item: &str) -> Vec<RunState> {
        self.transitions
            .read()
            .iter()
            .filter(|t| t.item == item)
            .map(|t| t.to)
            .collect()
    }

    /// Counts transitions into `state`.
    #[must_use]
    pub fn count_entering(&self, state: RunState) -> usize {
        self.transitions.read().iter().filter(|t| t.to == state).count()
    }
}

impl TransitionSink for CollectingTransitionSink {
    fn on_transition(&self, transition: &Transition) {
        self.transitions.write().push(transition.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_sink() {
        NoOpTransitionSink.on_transition(&Transition::new(
            "glm",
            "sub-01",
            RunState::Pending,
            RunState::Checking,
        ));
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingTransitionSink::new();
        assert!(sink.is_empty());

        sink.on_transition(&Transition::new("glm", "sub-01", RunState::Pending, RunState::Checking));
        sink.on_transition(&Transition::new("glm", "sub-02", RunState::Pending, RunState::Checking));
        sink.on_transition(&Transition::new("glm", "sub-01", RunState::Checking, RunState::Skipped));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.states_for("sub-01"), vec![RunState::Checking, RunState::Skipped]);
        assert_eq!(sink.count_entering(RunState::Checking), 2);

        sink.clear();
        assert!(sink.is_empty());
    }
}

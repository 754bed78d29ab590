//! Work items processed by a batch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One subject (optionally one session) processed by one guarded invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkItem {
    /// Subject label, e.g. `sub-07`.
    pub subject: String,
    /// Session label, e.g. `ses-01`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl WorkItem {
    /// Creates a work item for a subject.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            session: None,
        }
    }

    /// Sets the session.
    #[must_use]
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Returns the label used in logs and summaries (`sub-01` or `sub-01/ses-02`).
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.session {
            Some(session) => write!(f, "{}/{}", self.subject, session),
            None => write!(f, "{}", self.subject),
        }
    }
}

impl From<&str> for WorkItem {
    fn from(subject: &str) -> Self {
        Self::new(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        assert_eq!(WorkItem::new("sub-01").label(), "sub-01");
        assert_eq!(WorkItem::new("sub-01").with_session("ses-02").label(), "sub-01/ses-02");
    }

    #[test]
    fn test_from_str() {
        let item: WorkItem = "sub-07".into();
        assert_eq!(item.subject, "sub-07");
        assert!(item.session.is_none());
    }
}

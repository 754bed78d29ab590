//! Provenance record written as a metadata sidecar.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Step parameters recorded in a sidecar.
pub type Parameters = BTreeMap<String, serde_json::Value>;

/// Name written to `generated_by.name`; marks sidecars this crate owns.
pub const RECORDER_NAME: &str = "provguard";

/// Identity of the tool and script that produced an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBy {
    /// Recorder name.
    pub name: String,
    /// The script (step) that produced the output.
    pub path: String,
    /// Recorder version.
    pub version: String,
}

/// Everything needed to reproduce one output.
///
/// Fields are declared in alphabetical order so the serialized sidecar is
/// key-sorted at every level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// When the record was captured (ISO 8601, UTC).
    pub date: String,
    /// Human-readable description of the output.
    pub description: String,
    /// Producer identity.
    pub generated_by: GeneratedBy,
    /// Commit hash of the analysis code, or `"unknown"`.
    pub git_commit: String,
    /// Parameters the step ran with.
    #[serde(default)]
    pub parameters: Parameters,
    /// Declared software versions (name → version).
    #[serde(default)]
    pub software: BTreeMap<String, String>,
}

impl ProvenanceRecord {
    /// Returns the script that produced the output.
    #[must_use]
    pub fn script(&self) -> &str {
        &self.generated_by.path
    }

    /// Returns true if the record was written by this crate.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        self.generated_by.name == RECORDER_NAME
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Serializes the record as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProvenanceRecord {
        ProvenanceRecord {
            date: "2026-01-01T00:00:00.000000+00:00".to_string(),
            description: "GLM betas".to_string(),
            generated_by: GeneratedBy {
                name: RECORDER_NAME.to_string(),
                version: "0.1.0".to_string(),
                path: "glm".to_string(),
            },
            git_commit: "abc123".to_string(),
            parameters: Parameters::from([("smoothing".to_string(), serde_json::json!(6))]),
            software: BTreeMap::from([("fsl".to_string(), "6.0.7".to_string())]),
        }
    }

    #[test]
    fn test_sidecar_field_layout() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["generated_by"]["path"], "glm");
        assert_eq!(json["git_commit"], "abc123");
        assert_eq!(json["parameters"]["smoothing"], 6);
        assert_eq!(json["software"]["fsl"], "6.0.7");
    }

    #[test]
    fn test_sidecar_keys_are_sorted() {
        let text = record().to_json_pretty().unwrap();
        let positions: Vec<usize> = ["\"date\"", "\"description\"", "\"generated_by\"", "\"git_commit\"", "\"parameters\"", "\"software\""]
            .iter()
            .map(|k| text.find(k).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_ownership() {
        let mut r = record();
        assert!(r.is_owned());
        r.generated_by.name = "someone-else".to_string();
        assert!(!r.is_owned());
    }
}

//! Comprehensive tests for RunResult.

#[cfg(test)]
mod tests {
    use crate::core::{FailureKind, RunResult, RunState, Transition, WorkItem};
    use std::path::PathBuf;

    #[test]
    fn test_result_states_are_terminal() {
        let results = [
            RunResult::success(vec![]),
            RunResult::skipped("exists"),
            RunResult::failed(FailureKind::Step, "err"),
        ];
        for result in &results {
            assert!(result.state().is_terminal(), "{:?}", result.state());
        }
    }

    #[test]
    fn test_result_kinds_are_exclusive() {
        let success = RunResult::success(vec![PathBuf::from("a")]);
        assert!(success.is_success() && !success.is_skipped() && !success.is_failure());

        let skipped = RunResult::skipped("exists");
        assert!(!skipped.is_success() && skipped.is_skipped() && !skipped.is_failure());

        let failed = RunResult::failed(FailureKind::Io, "rename failed");
        assert!(!failed.is_success() && !failed.is_skipped() && failed.is_failure());
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(format!("{}", FailureKind::Step), "step");
        assert_eq!(format!("{}", FailureKind::Panic), "panic");
        assert_eq!(format!("{}", FailureKind::MissingOutput), "missing_output");
        assert_eq!(format!("{}", FailureKind::LayoutViolation), "layout_violation");
        assert_eq!(format!("{}", FailureKind::Provenance), "provenance");
    }

    #[test]
    fn test_result_to_dict() {
        let dict = RunResult::failed(FailureKind::Step, "bad input").to_dict();
        assert_eq!(dict.get("status"), Some(&serde_json::json!("failed")));
        assert_eq!(dict.get("kind"), Some(&serde_json::json!("step")));
        assert_eq!(dict.get("message"), Some(&serde_json::json!("bad input")));

        let dict = RunResult::success(vec![PathBuf::from("/d/processed/s/x.csv")]).to_dict();
        assert_eq!(dict.get("outputs"), Some(&serde_json::json!(["/d/processed/s/x.csv"])));
    }

    #[test]
    fn test_skipped_deserializes_from_tagged_json() {
        let json = r#"{"status": "skipped", "reason": "outputs exist"}"#;
        let result: RunResult = serde_json::from_str(json).unwrap();
        assert_eq!(result, RunResult::skipped("outputs exist"));
    }

    #[test]
    fn test_transition_records_item_label() {
        let item = WorkItem::new("sub-03").with_session("ses-01");
        let t = Transition::new("preproc", item.label(), RunState::Running, RunState::Failed);
        assert_eq!(t.item, "sub-03/ses-01");
        assert_eq!(t.from, RunState::Running);
    }
}

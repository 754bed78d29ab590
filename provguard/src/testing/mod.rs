//! Testing utilities for guarded steps.
//!
//! This module provides:
//! - Mock steps (writing, failing, panicking, silent)
//! - A throwaway project tree
//! - Assertions over run reports and sidecars

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_failed, assert_no_sidecar, assert_sidecar_matches, assert_skipped, assert_states,
    assert_succeeded,
};
pub use fixtures::{TestProject, TEST_REVISION};
pub use mocks::{MockStep, PanickingStep, SilentStep};

//! Core domain model types for provguard.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The run state machine
//! - The tagged run result
//! - Work items and transition events

mod item;
mod result;
#[cfg(test)]
mod result_tests;
mod status;
mod transition;

pub use item::WorkItem;
pub use result::{FailureKind, RunResult};
pub use status::RunState;
pub use transition::Transition;

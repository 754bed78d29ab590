//! Running one step over many work items.

mod runner;
mod summary;

pub use runner::BatchRunner;
pub use summary::{BatchSummary, FailureRecord};

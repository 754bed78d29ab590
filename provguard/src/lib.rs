//! # Provguard
//!
//! Configuration and provenance guard for scientific analysis task runners.
//!
//! Provguard wraps the per-subject steps of an analysis project with:
//!
//! - **Validated configuration**: a local config file checked against the
//!   template it was copied from, with no `<placeholder>` left unfilled
//! - **Skip-if-exists**: steps whose outputs are already on disk are not
//!   recomputed unless forced
//! - **Provenance sidecars**: every output gets a JSON record of the git
//!   revision, parameters and software versions that produced it
//! - **Layout contract**: outputs only under `processed/` and `reports/`
//! - **Batch runs**: one guarded invocation per subject, bounded in parallel
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use provguard::prelude::*;
//!
//! let config = provguard::config::load("config.template.toml", "config.toml")?;
//! let guard = Arc::new(RunGuard::from_config(&config));
//!
//! let step = FnStep::new("glm", ["beta.csv"], |ctx| {
//!     std::fs::write(ctx.staging_path(&ctx.outputs()[0]), fit(ctx.item())?)?;
//!     Ok(())
//! });
//!
//! let summary = BatchRunner::new(guard)
//!     .run(Arc::new(step), subjects.into_iter().map(WorkItem::new))
//!     .await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod batch;
pub mod config;
pub mod core;
pub mod errors;
pub mod guard;
pub mod layout;
pub mod observability;
pub mod provenance;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::{BatchRunner, BatchSummary, FailureRecord};
    pub use crate::config::{ConfigResolver, Configuration, Settings};
    pub use crate::core::{FailureKind, RunResult, RunState, Transition, WorkItem};
    pub use crate::errors::{ErrorInfo, GuardError, Result};
    pub use crate::guard::{FnStep, RunGuard, RunReport, Step, StepContext, TransitionSink};
    pub use crate::layout::Layout;
    pub use crate::observability::{init_logging, LoggingGuard, LoggingOptions};
    pub use crate::provenance::{Parameters, ProvenanceRecord, ProvenanceRecorder};
    pub use crate::utils::{generate_run_id, iso_timestamp, Timestamp};
}

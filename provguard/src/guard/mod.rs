//! Guarded execution of script steps.
//!
//! A [`RunGuard`] takes each invocation through
//! `Pending → Checking → (Skipped | Running → (Succeeded | Failed))`:
//! it rejects outputs outside the layout contract, skips work whose outputs
//! already exist, runs the [`Step`] against staged outputs and, on success,
//! moves them into place and writes their provenance sidecars.

mod runner;
mod sink;
mod step;


pub use runner::{RunGuard, RunReport};
pub use sink::{CollectingTransitionSink, NoOpTransitionSink, TransitionSink};
pub use step::{staging_path, FnStep, Step, StepContext};

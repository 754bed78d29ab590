//! Provenance capture and metadata sidecars.
//!
//! A [`ProvenanceRecord`] holds the git revision, timestamp, parameters and
//! software versions behind an output. [`ProvenanceRecorder`] captures
//! records and writes them as JSON sidecars next to the outputs they
//! describe, replacing only sidecars it wrote itself.

mod git;
mod record;
mod recorder;

pub use git::{current_revision, run_git, UNKNOWN_REVISION};
pub use record::{GeneratedBy, Parameters, ProvenanceRecord, RECORDER_NAME};
pub use recorder::{read_sidecar, sidecar_path, sidecar_path_among, ProvenanceRecorder};

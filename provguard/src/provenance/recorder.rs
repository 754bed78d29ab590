//! Captures provenance records and writes them as sidecars.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::debug;

use super::git::current_revision;
use super::record::{GeneratedBy, Parameters, ProvenanceRecord, RECORDER_NAME};
use crate::errors::{GuardError, Result, WriteError};
use crate::utils::{generate_uuid, iso_timestamp};

/// Captures provenance for a process and writes sidecars beside outputs.
///
/// The git revision is looked up once per recorder and reused for every
/// record it captures.
#[derive(Debug)]
pub struct ProvenanceRecorder {
    repo_root: PathBuf,
    software: BTreeMap<String, String>,
    revision: OnceCell<String>,
}

impl Default for ProvenanceRecorder {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ProvenanceRecorder {
    /// Creates a recorder reading the revision of the repository at `repo_root`.
    #[must_use]
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let mut software = BTreeMap::new();
        software.insert(RECORDER_NAME.to_string(), env!("CARGO_PKG_VERSION").to_string());
        Self {
            repo_root: repo_root.into(),
            software,
            revision: OnceCell::new(),
        }
    }

    /// Pins the revision instead of asking git (e.g. a hash supplied by CI).
    #[must_use]
    pub fn with_revision(self, revision: impl Into<String>) -> Self {
        let revision = OnceCell::with_value(revision.into());
        Self { revision, ..self }
    }

    /// Declares a software dependency and its version.
    #[must_use]
    pub fn with_software(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.software.insert(name.into(), version.into());
        self
    }

    /// Returns the declared software versions.
    #[must_use]
    pub fn software(&self) -> &BTreeMap<String, String> {
        &self.software
    }

    /// Returns the revision recorded in every captured record.
    pub fn git_commit(&self) -> &str {
        self.revision.get_or_init(|| current_revision(&self.repo_root))
    }

    /// Captures a record for `script_name` run with `parameters`.
    ///
    /// Never fails: an unavailable revision is recorded as `"unknown"`.
    #[must_use]
    pub fn capture(&self, script_name: &str, parameters: Parameters) -> ProvenanceRecord {
        ProvenanceRecord {
            date: iso_timestamp(),
            description: format!("Generated by {script_name}"),
            generated_by: GeneratedBy {
                name: RECORDER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                path: script_name.to_string(),
            },
            git_commit: self.git_commit().to_string(),
            parameters,
            software: self.software.clone(),
        }
    }

    /// Writes the record as `<output_dir>/<script>.provenance.json`.
    pub fn write(&self, record: &ProvenanceRecord, output_dir: &Path) -> Result<PathBuf> {
        let script = Path::new(record.script())
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("run");
        let path = output_dir.join(format!("{script}.provenance.json"));
        write_owned_json(record, &path)?;
        Ok(path)
    }

    /// Writes the record beside `output`, sharing its base name.
    pub fn write_sidecar(&self, record: &ProvenanceRecord, output: &Path) -> Result<PathBuf> {
        self.write_sidecar_among(record, output, &[])
    }

    /// Writes the record beside `output`, avoiding the paths of `outputs`
    /// produced alongside it.
    pub fn write_sidecar_among(
        &self,
        record: &ProvenanceRecord,
        output: &Path,
        outputs: &[PathBuf],
    ) -> Result<PathBuf> {
        let path = sidecar_path_among(output, outputs);
        write_owned_json(record, &path)?;
        Ok(path)
    }
}

/// Returns the sidecar path of an output.
///
/// `sub-01_bold.nii.gz` → `sub-01_bold.json`; an output that is itself
/// `<base>.json` gets `<base>.meta.json`.
#[must_use]
pub fn sidecar_path(output: &Path) -> PathBuf {
    sidecar_path_among(output, &[])
}

/// Returns the sidecar path of an output produced together with `outputs`.
///
/// Falls back to `<base>.meta.json` when `<base>.json` is the output itself
/// or one of its siblings, so a `sub-01_bold.nii.gz` / `sub-01_bold.json`
/// pair shares `sub-01_bold.meta.json`.
#[must_use]
pub fn sidecar_path_among(output: &Path, outputs: &[PathBuf]) -> PathBuf {
    let dir = output.parent().unwrap_or_else(|| Path::new(""));
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = match name.split('.').next() {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => name.clone(),
    };

    let candidate = dir.join(format!("{base}.json"));
    if candidate == output || outputs.contains(&candidate) {
        dir.join(format!("{base}.meta.json"))
    } else {
        candidate
    }
}

/// Reads a sidecar back.
pub fn read_sidecar(path: &Path) -> Result<ProvenanceRecord> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| GuardError::Serialization(e.to_string()))
}

/// Writes `record` to `path` via a temp file and rename.
///
/// An existing file is replaced only if it is a sidecar this crate wrote.
fn write_owned_json(record: &ProvenanceRecord, path: &Path) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| WriteError::new(dir, e))?;

    if path.exists() {
        let owned = read_sidecar(path).is_ok_and(|existing| existing.is_owned());
        if !owned {
            return Err(GuardError::SidecarConflict {
                path: path.to_path_buf(),
            });
        }
    }

    let body = record
        .to_json_pretty()
        .map_err(|e| GuardError::Serialization(e.to_string()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{file_name}.{}.tmp", generate_uuid().simple()));
    fs::write(&tmp, body + "\n").map_err(|e| WriteError::new(dir, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(WriteError::new(dir, e).into());
    }

    debug!(sidecar = %path.display(), script = record.script(), "Provenance sidecar written");
    Ok(())
}

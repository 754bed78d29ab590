//! Version-control revision lookup.

use std::path::Path;
use std::process::Command;

use tracing::debug;

/// Revision recorded when git or the repository is unavailable.
pub const UNKNOWN_REVISION: &str = "unknown";

/// Runs a git command in `repo_root` and returns its trimmed stdout.
pub fn run_git(repo_root: &Path, args: &[&str]) -> Result<String, String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .map_err(|e| format!("git failed: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "git failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Returns the commit hash checked out in `repo_root`, or `"unknown"`.
///
/// Never fails; the reason for falling back is logged at debug level.
#[must_use]
pub fn current_revision(repo_root: &Path) -> String {
    match run_git(repo_root, &["rev-parse", "HEAD"]) {
        Ok(hash) if !hash.is_empty() => hash,
        Ok(_) => UNKNOWN_REVISION.to_string(),
        Err(reason) => {
            debug!(repo = %repo_root.display(), %reason, "No git revision available");
            UNKNOWN_REVISION.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_revision_is_hash_or_unknown() {
        let dir = TempDir::new().unwrap();
        let rev = current_revision(dir.path());
        if rev != UNKNOWN_REVISION {
            assert_eq!(rev.len(), 40, "unexpected revision {rev}");
        }
    }

    #[test]
    fn test_missing_directory_is_unknown() {
        let rev = current_revision(Path::new("/definitely/not/a/real/path"));
        assert_eq!(rev, UNKNOWN_REVISION);
    }
}

//! Shallow clones through the `git` executable.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::warn;

/// A `git clone` that did not produce a working tree.
///
/// Messages may contain the clone URL; callers redact credentials before
/// surfacing them.
#[derive(Error, Debug)]
pub(crate) enum CloneError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git clone exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// `git clone --depth 1 --single-branch [--branch <branch>] <url> <dest>`.
///
/// On failure any partially written `dest` is removed.
pub(crate) fn shallow_clone(
    url: &str,
    branch: Option<&str>,
    dest: &Path,
) -> Result<(), CloneError> {
    let mut command = Command::new("git");
    command
        .args(["clone", "--quiet", "--depth", "1", "--single-branch"])
        // Never block on a credential prompt
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null());

    if let Some(branch) = branch {
        command.args(["--branch", branch]);
    }

    command.arg("--").arg(url).arg(dest);

    let result = match command.output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => Err(CloneError::Failed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        Err(e) => Err(CloneError::Spawn(e)),
    };

    if result.is_err() && dest.exists() {
        if let Err(e) = fs::remove_dir_all(dest) {
            warn!(path = %dest.display(), "could not remove partial clone: {}", e);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_failed_clone_leaves_nothing_behind() {
        let work = tempdir().unwrap();
        let dest = work.path().join("missing");
        let source = work.path().join("no-such-repository");

        let result = shallow_clone(&source.to_string_lossy(), None, &dest);

        assert!(result.is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn test_failed_clone_reports_git_output() {
        let work = tempdir().unwrap();
        let dest = work.path().join("out");
        let source = work.path().join("absent");

        match shallow_clone(&source.to_string_lossy(), Some("main"), &dest) {
            Err(CloneError::Failed { stderr, .. }) => assert!(!stderr.is_empty()),
            // git is not installed on this machine
            Err(CloneError::Spawn(_)) => {}
            Ok(()) => panic!("clone of a missing repository succeeded"),
        }
    }
}

// src/vcs/git.rs

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::errors::{AffectedError, Result};
use crate::path_utils::absolutize;
use crate::vcs::{ChangeSet, ChangeSource};

/// Changes from `git diff --name-status -M -z <base>` plus untracked files.
///
/// Staged and unstaged edits both show up in a diff against a commit, so
/// one diff covers both; overlapping reports collapse in [`ChangeSet::new`].
#[derive(Debug, Clone, Default)]
pub struct GitChangeSource;

impl GitChangeSource {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeSource for GitChangeSource {
    fn changes(&self, root: &Path, base: Option<&str>) -> Result<ChangeSet> {
        let toplevel = PathBuf::from(git(root, &["rev-parse", "--show-toplevel"])?.trim());
        let base = base.unwrap_or("HEAD");

        let diff = git(&toplevel, &["diff", "--name-status", "-M", "-z", base])?;
        let untracked = git(&toplevel, &["ls-files", "--others", "--exclude-standard", "-z"])?;

        let (mut changed, deleted) = parse_name_status(&diff);
        changed.extend(parse_nul_paths(&untracked));

        let to_abs = |rel: PathBuf| {
            let joined = toplevel.join(&rel);
            absolutize(&toplevel, &rel, joined.canonicalize().ok())
        };
        let set = ChangeSet::new(
            changed.into_iter().map(to_abs),
            deleted.into_iter().map(to_abs),
        );
        debug!(
            changed = set.changed.len(),
            deleted = set.deleted.len(),
            base,
            "collected git changes"
        );
        Ok(set)
    }
}

fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|e| AffectedError::VcsError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        return Err(AffectedError::VcsError(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `git diff --name-status -M -z` output into `(changed, deleted)`
/// paths relative to the repository root.
///
/// With `-z` every field is NUL-terminated and paths are never quoted, so
/// non-ASCII and tab-containing names come through verbatim. Renames report
/// the old path as deleted and the new one as changed; copies report only
/// the new path.
pub fn parse_name_status(output: &str) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut changed = Vec::new();
    let mut deleted = Vec::new();
    let mut fields = output.split('\0');

    while let Some(status) = fields.next() {
        let Some(kind) = status.bytes().next() else {
            continue;
        };
        let (first, second) = match kind {
            b'R' | b'C' => (fields.next(), fields.next()),
            _ => (fields.next(), None),
        };

        match (kind, first, second) {
            (b'D', Some(path), None) if !path.is_empty() => deleted.push(PathBuf::from(path)),
            (b'R', Some(old), Some(new)) if !old.is_empty() && !new.is_empty() => {
                deleted.push(PathBuf::from(old));
                changed.push(PathBuf::from(new));
            }
            (b'C', Some(_), Some(new)) if !new.is_empty() => changed.push(PathBuf::from(new)),
            (b'R' | b'C' | b'D', _, _) => debug!(status, "incomplete name-status record"),
            (_, Some(path), None) if !path.is_empty() => changed.push(PathBuf::from(path)),
            _ => debug!(status, "unrecognized name-status record"),
        }
    }

    (changed, deleted)
}

/// Split NUL-terminated `git ls-files -z` output into relative paths.
pub fn parse_nul_paths(output: &str) -> Vec<PathBuf> {
    output
        .split('\0')
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

// src/vcs/mod.rs

//! Where changed files come from.
//!
//! A [`ChangeSource`] reports `{changed, deleted}` absolute paths for a
//! project root. [`git::GitChangeSource`] asks git; [`ExplicitChanges`]
//! takes a list from the caller and bypasses version control entirely.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::path_utils::absolutize;

pub mod git;

pub use git::GitChangeSource;

/// Changed and deleted absolute paths, each deduplicated and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changed: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl ChangeSet {
    /// Build from arbitrary lists. A path listed as both changed and
    /// deleted counts as changed.
    pub fn new(
        changed: impl IntoIterator<Item = PathBuf>,
        deleted: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        let changed: BTreeSet<PathBuf> = changed.into_iter().collect();
        let deleted: BTreeSet<PathBuf> = deleted
            .into_iter()
            .filter(|p| !changed.contains(p))
            .collect();
        Self {
            changed: changed.into_iter().collect(),
            deleted: deleted.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed.len() + self.deleted.len()
    }

    /// BFS seeds: changed followed by deleted.
    pub fn seeds(&self) -> Vec<PathBuf> {
        self.changed
            .iter()
            .chain(self.deleted.iter())
            .cloned()
            .collect()
    }
}

pub trait ChangeSource {
    /// Changes under `root` relative to `base` (the source's default when
    /// `None`).
    fn changes(&self, root: &Path, base: Option<&str>) -> Result<ChangeSet>;
}

/// Caller-supplied changed-file list. Relative paths are taken relative to
/// the project root; paths that no longer exist are reported as deleted.
#[derive(Debug, Clone, Default)]
pub struct ExplicitChanges {
    paths: Vec<PathBuf>,
}

impl ExplicitChanges {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }
}

impl ChangeSource for ExplicitChanges {
    fn changes(&self, root: &Path, _base: Option<&str>) -> Result<ChangeSet> {
        let mut changed = Vec::new();
        let mut deleted = Vec::new();
        for path in &self.paths {
            let joined = if path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            };
            match joined.canonicalize() {
                Ok(canonical) => changed.push(canonical),
                Err(_) => deleted.push(absolutize(root, path, None)),
            }
        }
        Ok(ChangeSet::new(changed, deleted))
    }
}

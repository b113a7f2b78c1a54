// src/graph/discover.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

use crate::config::GraphSection;
use crate::fs::FileSystem;
use crate::path_utils::{has_component_in, is_confined, relative_str};

/// A source-eligible file found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub mtime: f64,
}

/// Which files under the project root belong in the graph.
///
/// Shared by full builds, incremental discovery and the watch session, so a
/// file ignored by one is ignored by all of them.
#[derive(Clone)]
pub struct IgnoreRules {
    root: PathBuf,
    ignore_dirs: Vec<String>,
    ignore_set: Option<GlobSet>,
    extensions: Vec<String>,
}

impl fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreRules")
            .field("root", &self.root)
            .field("ignore_dirs", &self.ignore_dirs)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl IgnoreRules {
    pub fn new(
        root: impl Into<PathBuf>,
        ignore_dirs: Vec<String>,
        ignore_globs: &[String],
        extensions: Vec<String>,
    ) -> Result<Self> {
        let ignore_set = if ignore_globs.is_empty() {
            None
        } else {
            Some(build_globset(ignore_globs).context("building ignore globset")?)
        };
        Ok(Self {
            root: root.into(),
            ignore_dirs,
            ignore_set,
            extensions,
        })
    }

    pub fn from_config(root: impl Into<PathBuf>, graph: &GraphSection) -> Result<Self> {
        Self::new(
            root,
            graph.ignore_dirs.clone(),
            &graph.ignore,
            graph.extensions.clone(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// True if `path` has a source extension (and is not a `.d.ts` file).
    pub fn has_source_extension(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// True if `path` is excluded by an ignored directory name or glob.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if has_component_in(&self.root, path, &self.ignore_dirs) {
            return true;
        }
        match (&self.ignore_set, relative_str(&self.root, path)) {
            (Some(set), Some(rel)) => set.is_match(&rel),
            _ => false,
        }
    }

    /// Full eligibility check for a single path: confined to the root, not
    /// ignored, and a source file by extension.
    pub fn is_eligible(&self, path: &Path) -> bool {
        is_confined(&self.root, path) && !self.is_ignored(path) && self.has_source_extension(path)
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Walk the project root and return every eligible source file with its
/// mtime, sorted by path.
///
/// Ignored directories are pruned before descending. Unreadable directories
/// and files whose mtime cannot be read are skipped with a warning.
pub fn discover_sources(fs: &dyn FileSystem, rules: &IgnoreRules) -> Vec<SourceFile> {
    let mut files = Vec::new();
    let mut stack = vec![rules.root().to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "skipping unreadable directory");
                continue;
            }
        };

        for path in entries {
            if rules.is_ignored(&path) {
                continue;
            }
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) && rules.has_source_extension(&path) {
                match fs.modified_ms(&path) {
                    Ok(mtime) => files.push(SourceFile { path, mtime }),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "skipping file without mtime");
                    }
                }
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(count = files.len(), root = %rules.root().display(), "discovered source files");
    files
}

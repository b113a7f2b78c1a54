// src/graph/mod.rs

//! Dependency graph representation and construction.
//!
//! - [`DependencyGraph`] holds the forward import map, its transpose and the
//!   runtime-observed edges merged into that transpose.
//! - [`builder`] turns a project directory into a graph.
//! - [`discover`] decides which files under the root are source-eligible.
//! - [`cycles`] reports import cycles for diagnostics.
//!
//! The graph is an adjacency map keyed by path; traversals keep their own
//! visited sets, so cycles need no special representation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub mod builder;
pub mod cycles;
pub mod discover;

pub use builder::GraphBuilder;
pub use discover::{IgnoreRules, SourceFile};

/// `path -> set of paths`, used for forward, reverse and runtime edge maps.
pub type ImportMap = BTreeMap<PathBuf, BTreeSet<PathBuf>>;

/// Exact transpose of `forward`. Only targets with at least one importer get
/// an entry.
pub fn transpose(forward: &ImportMap) -> ImportMap {
    let mut reverse = ImportMap::new();
    for (importer, imports) in forward {
        for target in imports {
            reverse
                .entry(target.clone())
                .or_default()
                .insert(importer.clone());
        }
    }
    reverse
}

/// Union `extra` into `into`.
pub fn merge_into(into: &mut ImportMap, extra: &ImportMap) {
    for (key, values) in extra {
        if values.is_empty() {
            continue;
        }
        into.entry(key.clone())
            .or_default()
            .extend(values.iter().cloned());
    }
}

/// Forward + reverse dependency graph.
///
/// Invariant: `reverse == transpose(forward) ∪ runtime`. Every mutation goes
/// through methods that keep the two in step; there is no way to edit the
/// reverse map directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    forward: ImportMap,
    reverse: ImportMap,
    /// Runtime-observed edges (`loaded module -> test files that loaded it`),
    /// kept separately so static edits never remove them.
    runtime: ImportMap,
    /// Last seen mtime per file in `forward`.
    mtimes: BTreeMap<PathBuf, f64>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a complete forward map plus per-file mtimes.
    pub fn from_forward(forward: ImportMap, mtimes: BTreeMap<PathBuf, f64>) -> Self {
        let reverse = transpose(&forward);
        Self {
            forward,
            reverse,
            runtime: ImportMap::new(),
            mtimes,
        }
    }

    /// A graph that consists of runtime edges only (runtime-trusted mode).
    pub fn from_runtime_edges(edges: ImportMap) -> Self {
        let mut graph = Self::new();
        graph.merge_runtime_edges(&edges);
        graph
    }

    pub fn forward(&self) -> &ImportMap {
        &self.forward
    }

    pub fn reverse(&self) -> &ImportMap {
        &self.reverse
    }

    pub fn runtime_edges(&self) -> &ImportMap {
        &self.runtime
    }

    pub fn mtime(&self, path: &Path) -> Option<f64> {
        self.mtimes.get(path).copied()
    }

    pub fn file_count(&self) -> usize {
        self.forward.len()
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty()
    }

    /// Files this one imports.
    pub fn imports_of(&self, path: &Path) -> Option<&BTreeSet<PathBuf>> {
        self.forward.get(path)
    }

    /// Files (static importers and runtime loaders) that depend on `path`.
    pub fn dependents_of(&self, path: &Path) -> Option<&BTreeSet<PathBuf>> {
        self.reverse.get(path)
    }

    /// True if the graph has ever observed `path`: as a parsed file, as an
    /// import target, or on either side of a runtime edge.
    pub fn knows(&self, path: &Path) -> bool {
        self.forward.contains_key(path)
            || self.reverse.contains_key(path)
            || self.runtime.values().any(|tests| tests.contains(path))
    }

    /// Every known path that `is_test` classifies as a test file.
    pub fn test_files(&self, is_test: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
        let mut all: BTreeSet<&PathBuf> = self.forward.keys().collect();
        all.extend(self.runtime.values().flatten());
        all.into_iter()
            .filter(|p| is_test(p.as_path()))
            .cloned()
            .collect()
    }

    /// Replace the static imports of `path` (insert if new).
    pub fn set_imports(&mut self, path: PathBuf, imports: BTreeSet<PathBuf>, mtime: f64) {
        self.unlink_static(&path);
        for target in &imports {
            self.reverse
                .entry(target.clone())
                .or_default()
                .insert(path.clone());
        }
        self.mtimes.insert(path.clone(), mtime);
        self.forward.insert(path, imports);
    }

    /// Drop a file's own entry and the static edges it contributed.
    ///
    /// Edges *into* the file stay as long as some importer still lists it;
    /// that keeps the reverse map an exact transpose, and lets a deleted file
    /// used as a BFS seed still reach its importers.
    pub fn remove_file(&mut self, path: &Path) {
        self.unlink_static(path);
        self.forward.remove(path);
        self.mtimes.remove(path);
    }

    /// Union runtime-observed edges into the reverse map. Strictly additive.
    pub fn merge_runtime_edges(&mut self, edges: &ImportMap) {
        merge_into(&mut self.runtime, edges);
        merge_into(&mut self.reverse, edges);
    }

    fn unlink_static(&mut self, path: &Path) {
        let Some(old) = self.forward.get(path) else {
            return;
        };
        for target in old {
            let keep_runtime = self
                .runtime
                .get(target)
                .is_some_and(|loaders| loaders.contains(path));
            if keep_runtime {
                continue;
            }
            if let Some(importers) = self.reverse.get_mut(target) {
                importers.remove(path);
                if importers.is_empty() {
                    self.reverse.remove(target);
                }
            }
        }
    }
}

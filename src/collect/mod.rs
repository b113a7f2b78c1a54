// src/collect/mod.rs

//! Runtime edge collection.
//!
//! After each test module finishes, the host reports which modules it
//! actually loaded (`loaded path -> timing`). The collector turns those
//! reports into a reverse-edge map `loaded module -> test files`, entirely
//! independent of static analysis, and hands it to a callback at the end of
//! a clean run.
//!
//! Lifecycle per run:
//!
//! - `on_run_start` resets the accumulator;
//! - `on_test_module_end` records edges;
//! - `on_run_end(Completed)` flushes non-empty edges to the callback and
//!   clears them;
//! - `on_run_end(Interrupted)` keeps them, so a continuation of the same run
//!   can still add to them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::graph::ImportMap;
use crate::path_utils::{confined_path, has_component_in};
use crate::types::RunStatus;

/// Per-module timing reported by the host. Only the keys matter for edges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModuleTiming {
    pub self_time_ms: f64,
    pub total_time_ms: f64,
}

/// Host diagnostics for one finished test module.
pub type ModuleDiagnostics = BTreeMap<String, ModuleTiming>;

/// Called with the edges of a completed run.
pub type FlushCallback = Box<dyn FnMut(ImportMap) + Send>;

/// Explicitly owned store of edges for the current run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EdgeAccumulator {
    edges: ImportMap,
}

impl EdgeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.edges.clear();
    }

    /// Record that `test` loaded `module`. Returns false if already known.
    pub fn record(&mut self, module: PathBuf, test: PathBuf) -> bool {
        self.edges.entry(module).or_default().insert(test)
    }

    /// Move the edges out, leaving the accumulator empty.
    pub fn take(&mut self) -> ImportMap {
        std::mem::take(&mut self.edges)
    }

    pub fn edges(&self) -> &ImportMap {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }
}

pub struct RuntimeEdgeCollector {
    accumulator: EdgeAccumulator,
    root: Option<PathBuf>,
    dependency_dirs: Vec<String>,
    on_flush: FlushCallback,
}

impl fmt::Debug for RuntimeEdgeCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeEdgeCollector")
            .field("accumulator", &self.accumulator)
            .field("root", &self.root)
            .field("dependency_dirs", &self.dependency_dirs)
            .finish_non_exhaustive()
    }
}

impl RuntimeEdgeCollector {
    pub fn new(
        accumulator: EdgeAccumulator,
        dependency_dirs: Vec<String>,
        on_flush: FlushCallback,
    ) -> Self {
        Self {
            accumulator,
            root: None,
            dependency_dirs,
            on_flush,
        }
    }

    /// Set the project root. May arrive after the first module-end event.
    pub fn configure(&mut self, root: impl Into<PathBuf>) {
        self.root = Some(root.into());
    }

    pub fn is_configured(&self) -> bool {
        self.root.is_some()
    }

    pub fn accumulator(&self) -> &EdgeAccumulator {
        &self.accumulator
    }

    pub fn on_run_start(&mut self) {
        self.accumulator.reset();
    }

    /// Record the modules `test_path` loaded. Returns how many new edges were
    /// added.
    pub fn on_test_module_end(&mut self, test_path: &Path, diagnostics: &ModuleDiagnostics) -> usize {
        let Some(root) = self.root.as_deref() else {
            trace!(test = %test_path.display(), "collector not configured yet; event dropped");
            return 0;
        };

        let Some(test) = test_path.to_str().and_then(|raw| confined_path(root, raw)) else {
            debug!(test = %test_path.display(), "test module outside the project root; event dropped");
            return 0;
        };

        let mut added = 0;
        for loaded in diagnostics.keys() {
            let Some(module) = confined_path(root, loaded) else {
                continue;
            };
            if module == test || has_component_in(root, &module, &self.dependency_dirs) {
                continue;
            }
            if self.accumulator.record(module, test.clone()) {
                added += 1;
            }
        }
        added
    }

    /// Returns true if the callback was invoked.
    pub fn on_run_end(&mut self, status: RunStatus) -> bool {
        match status {
            RunStatus::Interrupted => {
                debug!(
                    edges = self.accumulator.edge_count(),
                    "run interrupted; keeping runtime edges for the continuation"
                );
                false
            }
            RunStatus::Completed if self.accumulator.is_empty() => false,
            RunStatus::Completed => {
                let edges = self.accumulator.take();
                debug!(modules = edges.len(), "flushing runtime edges");
                (self.on_flush)(edges);
                true
            }
        }
    }
}

// src/graph/builder.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info, trace, warn};

use crate::fs::FileSystem;
use crate::graph::cycles::import_cycles;
use crate::graph::discover::{discover_sources, IgnoreRules, SourceFile};
use crate::graph::{DependencyGraph, ImportMap};
use crate::parse::{ImportParser, Resolver};

/// Turns a project directory into a forward dependency graph using the
/// pluggable parser and resolver.
///
/// Edge policy (on top of whatever the parser already filters):
/// - unresolved specifiers are dropped;
/// - targets outside the root, inside ignored directories, or without a
///   source extension (assets) are dropped;
/// - self-imports are dropped.
///
/// A file that cannot be read still gets an (empty) entry, with a warning,
/// so it is not rediscovered as "added" on every run.
pub struct GraphBuilder {
    fs: Arc<dyn FileSystem>,
    rules: IgnoreRules,
    parser: Arc<dyn ImportParser>,
    resolver: Arc<dyn Resolver>,
    parses: AtomicUsize,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("rules", &self.rules)
            .field("parses", &self.parse_count())
            .finish_non_exhaustive()
    }
}

impl GraphBuilder {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        rules: IgnoreRules,
        parser: Arc<dyn ImportParser>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            fs,
            rules,
            parser,
            resolver,
            parses: AtomicUsize::new(0),
        }
    }

    pub fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Number of files parsed by this builder so far.
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }

    /// Eligible source files currently on disk.
    pub fn discover(&self) -> Vec<SourceFile> {
        discover_sources(self.fs.as_ref(), &self.rules)
    }

    /// Full build: discover every source file and parse all of them.
    pub fn build(&self) -> DependencyGraph {
        let sources = self.discover();
        let mut forward = ImportMap::new();
        let mut mtimes = BTreeMap::new();

        for source in sources {
            let imports = self.parse_file(&source.path);
            mtimes.insert(source.path.clone(), source.mtime);
            forward.insert(source.path, imports);
        }

        let graph = DependencyGraph::from_forward(forward, mtimes);
        info!(
            files = graph.file_count(),
            edges = graph.edge_count(),
            "built dependency graph"
        );
        let cycles = import_cycles(graph.forward());
        if !cycles.is_empty() {
            debug!(count = cycles.len(), "graph contains import cycles");
        }
        graph
    }

    /// Parse one file and return the resolved, filtered set of files it imports.
    pub fn parse_file(&self, path: &Path) -> BTreeSet<PathBuf> {
        self.parses.fetch_add(1, Ordering::Relaxed);

        let text = match self.fs.read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable source file");
                return BTreeSet::new();
            }
        };

        let from_dir = path.parent().unwrap_or(self.rules.root());
        let mut imports = BTreeSet::new();

        for specifier in self.parser.extract_imports(path, &text) {
            let Some(target) = self.resolver.resolve(from_dir, &specifier) else {
                trace!(file = %path.display(), specifier, "unresolved import dropped");
                continue;
            };
            if target == path {
                continue;
            }
            if !self.rules.is_eligible(&target) {
                trace!(
                    file = %path.display(),
                    target = %target.display(),
                    "import outside the graph dropped"
                );
                continue;
            }
            imports.insert(target);
        }

        imports
    }

    /// Re-parse (or drop) specific files in an existing graph.
    ///
    /// Used by the watch session: files that still exist and are eligible
    /// get fresh imports, anything else is removed.
    pub fn refresh_files<'a>(
        &self,
        graph: &mut DependencyGraph,
        paths: impl IntoIterator<Item = &'a Path>,
    ) {
        for path in paths {
            if self.rules.is_eligible(path) && self.fs.is_file(path) {
                match self.fs.modified_ms(path) {
                    Ok(mtime) => {
                        let imports = self.parse_file(path);
                        graph.set_imports(path.to_path_buf(), imports, mtime);
                    }
                    Err(_) => graph.remove_file(path),
                }
            } else {
                graph.remove_file(path);
            }
        }
    }
}

// src/engine/mod.rs

//! Host-facing façade.
//!
//! [`Engine`] owns everything one invocation needs: configuration, the file
//! system, the graph builder, the cache codec and the loaded graph. A host
//! test runner (or the CLI) only talks to this type:
//!
//! - [`Engine::open`] loads or builds the graph and persists it if needed;
//! - [`Engine::select`] answers "which tests are affected by these changes";
//! - [`Engine::runtime_collector`] gives the per-run edge collector wired to
//!   the cache;
//! - [`Engine::watch_filter`] gives the debounced watch-mode predicate.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::CacheCodec;
use crate::collect::{EdgeAccumulator, RuntimeEdgeCollector};
use crate::config::ConfigFile;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::cycles::import_cycles;
use crate::graph::{DependencyGraph, GraphBuilder, IgnoreRules};
use crate::loader::{IncrementalLoader, LoadOutcome, LoadResult};
use crate::parse::{EsImportParser, ImportParser, RelativeResolver, Resolver};
use crate::select::{affected_tests, TestMatcher};
use crate::types::{GraphMode, ZeroAffectedPolicy};
use crate::vcs::ChangeSet;
use crate::watch::WatchFilter;

/// Result of one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The affected tests (possibly none).
    Tests(Vec<PathBuf>),
    /// Nothing was affected and the policy says to run everything.
    FullSuite(Vec<PathBuf>),
}

impl Selection {
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Selection::Tests(paths) | Selection::FullSuite(paths) => paths,
        }
    }

    pub fn is_full_suite(&self) -> bool {
        matches!(self, Selection::FullSuite(_))
    }
}

pub struct Engine {
    root: PathBuf,
    config: ConfigFile,
    builder: GraphBuilder,
    codec: Arc<CacheCodec>,
    matcher: TestMatcher,
    graph: DependencyGraph,
    outcome: LoadOutcome,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.root)
            .field("outcome", &self.outcome)
            .field("files", &self.graph.file_count())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Open with explicit collaborators. `root` must already be canonical.
    pub fn open(
        root: PathBuf,
        config: ConfigFile,
        fs: Arc<dyn FileSystem>,
        parser: Arc<dyn ImportParser>,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self> {
        let graph_cfg = config.graph_section();
        let rules = IgnoreRules::from_config(&root, graph_cfg)?;
        let matcher = TestMatcher::new(&root, &graph_cfg.test_patterns)?;
        let builder = GraphBuilder::new(Arc::clone(&fs), rules, parser, resolver);
        let codec = Arc::new(CacheCodec::new(
            fs,
            &root,
            &config.config_section().cache_path,
        ));

        let mut engine = Self {
            root,
            config,
            builder,
            codec,
            matcher,
            graph: DependencyGraph::new(),
            outcome: LoadOutcome::CacheHit,
        };
        engine.load();
        Ok(engine)
    }

    /// Open against the real file system with the default parser and
    /// resolver.
    pub fn open_default(root: &Path, config: ConfigFile) -> Result<Self> {
        let root = root.canonicalize()?;
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let parser: Arc<dyn ImportParser> = Arc::new(EsImportParser::new()?);
        let resolver: Arc<dyn Resolver> = Arc::new(RelativeResolver::new(
            Arc::clone(&fs),
            config.graph_section().extensions.clone(),
        ));
        Self::open(root, config, fs, parser, resolver)
    }

    fn load(&mut self) {
        let section = self.config.config_section();
        if !section.cache {
            let graph = self.builder.build();
            self.graph = graph;
            self.outcome = LoadOutcome::Rebuilt {
                reason: "cache disabled".to_string(),
            };
            return;
        }

        let mode = section.mode;
        let loader = IncrementalLoader::new(&self.builder, &self.codec);
        let result = loader.load(mode);
        if let Err(err) = loader.persist(mode, &result) {
            warn!(error = %err, path = %self.codec.path().display(), "failed to write cache");
        }
        let LoadResult { graph, outcome, .. } = result;
        self.graph = graph;
        self.outcome = outcome;
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// How the graph was obtained by `open`.
    pub fn outcome(&self) -> &LoadOutcome {
        &self.outcome
    }

    pub fn codec(&self) -> &CacheCodec {
        &self.codec
    }

    pub fn matcher(&self) -> &TestMatcher {
        &self.matcher
    }

    pub fn is_test(&self, path: &Path) -> bool {
        self.matcher.is_test(path)
    }

    /// Every test file the graph knows about.
    pub fn all_tests(&self) -> Vec<PathBuf> {
        self.graph.test_files(|p| self.matcher.is_test(p))
    }

    pub fn cycles(&self) -> Vec<Vec<PathBuf>> {
        import_cycles(self.graph.forward())
    }

    /// Affected tests for `changes`, with the zero-affected policy applied.
    pub fn select(&self, changes: &ChangeSet) -> Selection {
        let seeds = changes.seeds();
        let affected = affected_tests(self.graph.reverse(), &seeds, |p| self.matcher.is_test(p));
        info!(
            seeds = seeds.len(),
            affected = affected.len(),
            "selected affected tests"
        );

        if affected.is_empty()
            && self.config.config_section().on_zero_affected == ZeroAffectedPolicy::All
        {
            debug!("no affected tests; falling back to the full suite");
            return Selection::FullSuite(self.all_tests());
        }
        Selection::Tests(affected)
    }

    /// Re-parse or drop `paths` in the live graph (watch mode) and persist.
    pub fn refresh_files(&mut self, paths: &[PathBuf]) {
        self.builder
            .refresh_files(&mut self.graph, paths.iter().map(PathBuf::as_path));

        let section = self.config.config_section();
        if !section.cache {
            return;
        }
        let saved = match section.mode {
            GraphMode::Static => self.codec.save_mtime(&self.graph, None),
            GraphMode::Runtime => self.codec.save_reverse_map(&self.graph),
        };
        if let Err(err) = saved {
            warn!(error = %err, "failed to write cache");
        }
    }

    /// A collector configured for this project whose flush merges the edges
    /// into the cache on disk. With the cache off the edges are only logged.
    pub fn runtime_collector(&self) -> RuntimeEdgeCollector {
        let codec = Arc::clone(&self.codec);
        let cache_enabled = self.config.config_section().cache;
        let mut collector = RuntimeEdgeCollector::new(
            EdgeAccumulator::new(),
            self.config.graph_section().dependency_dirs.clone(),
            Box::new(move |edges| {
                if !cache_enabled {
                    debug!(modules = edges.len(), "cache disabled; runtime edges not persisted");
                    return;
                }
                if let Err(err) = codec.merge_runtime_edges(&edges) {
                    warn!(error = %err, "failed to persist runtime edges");
                }
            }),
        );
        collector.configure(&self.root);
        collector
    }

    pub fn watch_filter(&self) -> WatchFilter {
        WatchFilter::new(Duration::from_millis(
            self.config.watch_section().debounce_ms,
        ))
    }

    /// The ignore and extension rules the graph is built with.
    pub fn rules(&self) -> &IgnoreRules {
        self.builder.rules()
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.builder.fs()
    }
}

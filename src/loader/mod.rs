// src/loader/mod.rs

//! Decide per invocation how much of the persisted graph can be trusted.
//!
//! Static mode (`files` + `runtimeEdges` cache form):
//!
//! 1. No usable snapshot ⇒ full rebuild; persisted runtime edges are dropped.
//! 2. Otherwise stat every recorded file and walk the root for new ones,
//!    giving three disjoint sets: changed, added, deleted.
//! 3. All empty ⇒ cache hit, nothing is parsed.
//! 4. Otherwise re-parse changed files, then added files, drop deleted ones
//!    and merge the validated runtime edges.
//!
//! Runtime-trusted mode lives in [`runtime`].

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::cache::{CacheCodec, MtimeSnapshot, Snapshot};
use crate::graph::{DependencyGraph, GraphBuilder, ImportMap, SourceFile};
use crate::types::GraphMode;

pub mod runtime;

/// How a graph was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Snapshot reused as-is.
    CacheHit,
    /// Snapshot reused after re-parsing a few files.
    Refreshed {
        changed: usize,
        added: usize,
        deleted: usize,
    },
    /// Older mtime-validated snapshot converted to the reverse-map form.
    Migrated,
    /// Snapshot unusable; built from scratch.
    Rebuilt { reason: String },
}

impl LoadOutcome {
    /// True when the in-memory graph differs from what is on disk.
    pub fn needs_save(&self) -> bool {
        !matches!(self, LoadOutcome::CacheHit)
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::CacheHit => write!(f, "cache hit"),
            LoadOutcome::Refreshed {
                changed,
                added,
                deleted,
            } => write!(
                f,
                "refreshed ({changed} changed, {added} added, {deleted} deleted)"
            ),
            LoadOutcome::Migrated => write!(f, "migrated to reverse-map cache"),
            LoadOutcome::Rebuilt { reason } => write!(f, "rebuilt ({reason})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadResult {
    pub graph: DependencyGraph,
    pub outcome: LoadOutcome,
    /// Files parsed during this load.
    pub reparsed: usize,
}

/// Ties a [`GraphBuilder`] to a [`CacheCodec`].
#[derive(Debug)]
pub struct IncrementalLoader<'a> {
    builder: &'a GraphBuilder,
    codec: &'a CacheCodec,
}

impl<'a> IncrementalLoader<'a> {
    pub fn new(builder: &'a GraphBuilder, codec: &'a CacheCodec) -> Self {
        Self { builder, codec }
    }

    pub fn load(&self, mode: GraphMode) -> LoadResult {
        let result = match mode {
            GraphMode::Static => self.load_static(),
            GraphMode::Runtime => runtime::load_runtime(self.builder, self.codec),
        };
        info!(
            outcome = %result.outcome,
            files = result.graph.file_count(),
            reparsed = result.reparsed,
            "dependency graph ready"
        );
        result
    }

    /// Write the graph back if `load` changed it.
    pub fn persist(&self, mode: GraphMode, result: &LoadResult) -> Result<()> {
        if !result.outcome.needs_save() {
            return Ok(());
        }
        match (mode, &result.outcome) {
            (GraphMode::Runtime, _) => self.codec.save_reverse_map(&result.graph),
            // A rebuild starts from a fresh baseline: explicitly no runtime edges.
            (GraphMode::Static, LoadOutcome::Rebuilt { .. }) => {
                self.codec.save_mtime(&result.graph, Some(&ImportMap::new()))
            }
            (GraphMode::Static, _) => self.codec.save_mtime(&result.graph, None),
        }
    }

    fn load_static(&self) -> LoadResult {
        match self.codec.load() {
            Ok(Snapshot::Mtime(snapshot)) => self.refresh(snapshot),
            Ok(Snapshot::ReverseMap(_)) => {
                rebuild(self.builder, "cache holds a reverse map without file mtimes".to_string())
            }
            Err(miss) => rebuild(self.builder, miss.to_string()),
        }
    }

    fn refresh(&self, snapshot: MtimeSnapshot) -> LoadResult {
        let rules = self.builder.rules();
        let fs = self.builder.fs();

        // Stale pass over recorded files.
        let mut changed: Vec<(PathBuf, f64)> = Vec::new();
        let mut deleted: Vec<PathBuf> = Vec::new();
        for (path, record) in &snapshot.files {
            if !rules.is_eligible(path) || !fs.is_file(path) {
                deleted.push(path.clone());
                continue;
            }
            match fs.modified_ms(path) {
                Ok(mtime) if mtime == record.mtime => {}
                Ok(mtime) => changed.push((path.clone(), mtime)),
                Err(_) => deleted.push(path.clone()),
            }
        }

        // Discovery pass: only files the snapshot has never seen.
        let added: Vec<SourceFile> = self
            .builder
            .discover()
            .into_iter()
            .filter(|file| !snapshot.files.contains_key(&file.path))
            .collect();

        let mut graph = snapshot.static_graph();

        if changed.is_empty() && added.is_empty() && deleted.is_empty() {
            if let Some(edges) = snapshot.runtime_edges.edges() {
                graph.merge_runtime_edges(edges);
            }
            return LoadResult {
                graph,
                outcome: LoadOutcome::CacheHit,
                reparsed: 0,
            };
        }

        debug!(
            changed = changed.len(),
            added = added.len(),
            deleted = deleted.len(),
            "refreshing cached graph"
        );

        let mut reparsed = 0;
        for (path, mtime) in &changed {
            let imports = self.builder.parse_file(path);
            graph.set_imports(path.clone(), imports, *mtime);
            reparsed += 1;
        }
        for file in &added {
            let imports = self.builder.parse_file(&file.path);
            graph.set_imports(file.path.clone(), imports, file.mtime);
            reparsed += 1;
        }
        for path in &deleted {
            graph.remove_file(path);
        }

        if let Some(edges) = snapshot.runtime_edges.edges() {
            graph.merge_runtime_edges(edges);
        }

        LoadResult {
            graph,
            outcome: LoadOutcome::Refreshed {
                changed: changed.len(),
                added: added.len(),
                deleted: deleted.len(),
            },
            reparsed,
        }
    }
}

pub(crate) fn rebuild(builder: &GraphBuilder, reason: String) -> LoadResult {
    debug!(%reason, "rebuilding dependency graph from scratch");
    let graph = builder.build();
    let reparsed = graph.file_count();
    LoadResult {
        graph,
        outcome: LoadOutcome::Rebuilt { reason },
        reparsed,
    }
}

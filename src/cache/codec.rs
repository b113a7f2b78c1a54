// src/cache/codec.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::debug;

use crate::cache::atomic::{atomic_write, sweep_orphans};
use crate::cache::schema::{decode, CacheMiss, MtimeSnapshot, ReverseMapSnapshot, Snapshot};
use crate::fs::FileSystem;
use crate::graph::{merge_into, DependencyGraph, ImportMap};

/// Sole owner of the on-disk cache file.
///
/// Reads never fail: every problem comes back as a [`CacheMiss`]. Writes
/// are atomic and return an error only for real I/O failures, which callers
/// log and otherwise ignore.
#[derive(Debug, Clone)]
pub struct CacheCodec {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    path: PathBuf,
}

impl CacheCodec {
    /// `cache_path` is relative to `root`.
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, cache_path: &Path) -> Self {
        let root = root.into();
        let path = root.join(cache_path);
        Self { fs, root, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read and validate the snapshot. Stale temp files from a crashed write
    /// are swept first.
    pub fn load(&self) -> std::result::Result<Snapshot, CacheMiss> {
        sweep_orphans(self.fs.as_ref(), &self.path, now_ms() as f64);

        if !self.fs.exists(&self.path) {
            return Err(CacheMiss::Missing(self.path.clone()));
        }
        let text = self
            .fs
            .read_to_string(&self.path)
            .map_err(|err| CacheMiss::Unreadable(format!("{err:#}")))?;
        decode(&text, &self.root)
    }

    /// Persist `graph` in the mtime-validated form.
    ///
    /// With `runtime_edges = None` the edges currently on disk are carried
    /// over (read-merge-write), so a plain static save never erases them.
    /// Either way the edges are pruned against `graph` before writing.
    pub fn save_mtime(&self, graph: &DependencyGraph, runtime_edges: Option<&ImportMap>) -> Result<()> {
        let edges = match runtime_edges {
            Some(edges) => edges.clone(),
            None => self.persisted_runtime_edges(),
        };
        self.write_mtime(graph, edges)
    }

    /// Persist the reverse map of `graph` in the direct reverse-map form,
    /// dropping paths no longer on disk.
    pub fn save_reverse_map(&self, graph: &DependencyGraph) -> Result<()> {
        let mut snapshot = ReverseMapSnapshot::from_graph(graph, now_ms());
        snapshot.reverse_map = self.prune_missing(snapshot.reverse_map);
        self.write_bytes(&snapshot.encode().context("encoding reverse-map cache")?)?;
        debug!(entries = snapshot.reverse_map.len(), path = %self.path.display(), "saved reverse-map cache");
        Ok(())
    }

    /// Union freshly observed runtime edges into whatever is on disk and write
    /// it back in the same form.
    pub fn merge_runtime_edges(&self, edges: &ImportMap) -> Result<()> {
        match self.load() {
            Ok(Snapshot::Mtime(snapshot)) => {
                let graph = snapshot.static_graph();
                let mut merged = snapshot.runtime_edges.edges().cloned().unwrap_or_default();
                merge_into(&mut merged, edges);
                self.write_mtime(&graph, merged)
            }
            Ok(Snapshot::ReverseMap(mut snapshot)) => {
                merge_into(&mut snapshot.reverse_map, edges);
                snapshot.reverse_map = self.prune_missing(snapshot.reverse_map);
                snapshot.built_at = now_ms();
                self.write_bytes(&snapshot.encode().context("encoding reverse-map cache")?)
            }
            Err(miss) => {
                debug!(reason = %miss, "no usable cache to merge runtime edges into; skipping");
                Ok(())
            }
        }
    }

    /// Drop runtime edges that can no longer matter: keys not in the forward
    /// graph, and loaders that are neither in the forward graph nor on disk.
    pub fn prune_runtime_edges(&self, graph: &DependencyGraph, edges: ImportMap) -> ImportMap {
        let forward = graph.forward();
        let before = edges.len();
        let pruned: ImportMap = edges
            .into_iter()
            .filter(|(key, _)| forward.contains_key(key))
            .filter_map(|(key, loaders)| {
                let loaders: BTreeSet<PathBuf> = loaders
                    .into_iter()
                    .filter(|loader| forward.contains_key(loader) || self.fs.exists(loader))
                    .collect();
                (!loaders.is_empty()).then_some((key, loaders))
            })
            .collect();
        if pruned.len() != before {
            debug!(dropped = before - pruned.len(), "pruned stale runtime edge keys");
        }
        pruned
    }

    fn persisted_runtime_edges(&self) -> ImportMap {
        match self.load() {
            Ok(Snapshot::Mtime(snapshot)) => snapshot.runtime_edges.edges().cloned().unwrap_or_default(),
            Ok(Snapshot::ReverseMap(snapshot)) => snapshot.reverse_map,
            Err(_) => ImportMap::new(),
        }
    }

    fn write_mtime(&self, graph: &DependencyGraph, edges: ImportMap) -> Result<()> {
        let edges = self.prune_runtime_edges(graph, edges);
        let snapshot = MtimeSnapshot::from_graph(graph, Some(edges), now_ms());
        self.write_bytes(&snapshot.encode().context("encoding mtime cache")?)?;
        debug!(files = snapshot.files.len(), path = %self.path.display(), "saved mtime cache");
        Ok(())
    }

    fn prune_missing(&self, map: ImportMap) -> ImportMap {
        map.into_iter()
            .filter(|(key, _)| self.fs.exists(key))
            .filter_map(|(key, values)| {
                let values: BTreeSet<PathBuf> =
                    values.into_iter().filter(|v| self.fs.exists(v)).collect();
                (!values.is_empty()).then_some((key, values))
            })
            .collect()
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        atomic_write(self.fs.as_ref(), &self.path, bytes)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

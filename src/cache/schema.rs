// src/cache/schema.rs

//! On-disk cache schemas and their strict decoder.
//!
//! Two forms coexist, tagged by `version`:
//!
//! ```json
//! { "version": 1, "builtAt": 0,
//!   "files": { "/p/a.ts": { "mtime": 1.5, "imports": ["/p/b.ts"] } },
//!   "runtimeEdges": { "/p/b.ts": ["/p/a.test.ts"] } }
//!
//! { "version": 2, "builtAt": 0,
//!   "reverseMap": { "/p/b.ts": ["/p/a.test.ts"] } }
//! ```
//!
//! Decoding goes through an untyped `serde_json::Value` first so that every
//! shape violation can be classified instead of surfacing as a generic serde
//! error, and so reserved keys can be stripped before anything looks at them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::graph::{DependencyGraph, ImportMap};
use crate::path_utils::confined_path;

pub const MTIME_VERSION: u64 = 1;
pub const REVERSE_MAP_VERSION: u64 = 2;

/// Keys that would alias object-prototype machinery in a JS consumer of the
/// same file. They are stripped at every depth before validation.
pub const RESERVED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Why a snapshot could not be used. Only ever logged; a miss means rebuild.
#[derive(Debug, Error)]
pub enum CacheMiss {
    #[error("no cache file at {0:?}")]
    Missing(PathBuf),

    #[error("cache file unreadable: {0}")]
    Unreadable(String),

    #[error("cache file is not valid JSON: {0}")]
    Corrupt(String),

    #[error("unknown cache schema version: {0}")]
    UnknownVersion(String),

    #[error("cache schema violation: {0}")]
    Invalid(String),

    #[error("mtime-validated cache carries no runtime edges")]
    NoRuntimeEdges,
}

/// One file record of the mtime-validated form.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub mtime: f64,
    pub imports: BTreeSet<PathBuf>,
}

/// State of the optional `runtimeEdges` side table.
///
/// Validated independently from `files`: an invalid table only disables the
/// merge step.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RuntimeEdgesTable {
    #[default]
    Absent,
    Valid(ImportMap),
    Invalid,
}

impl RuntimeEdgesTable {
    /// The edges if the table was present and valid.
    pub fn edges(&self) -> Option<&ImportMap> {
        match self {
            RuntimeEdgesTable::Valid(edges) => Some(edges),
            _ => None,
        }
    }
}

/// Version 1: per-file mtime + imports, optional runtime edges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MtimeSnapshot {
    pub built_at: u64,
    pub files: BTreeMap<PathBuf, FileRecord>,
    pub runtime_edges: RuntimeEdgesTable,
}

/// Version 2: a reverse map trusted as-is.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReverseMapSnapshot {
    pub built_at: u64,
    pub reverse_map: ImportMap,
}

/// A decoded snapshot of either form.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Mtime(MtimeSnapshot),
    ReverseMap(ReverseMapSnapshot),
}

impl MtimeSnapshot {
    pub fn from_graph(graph: &DependencyGraph, runtime_edges: Option<ImportMap>, built_at: u64) -> Self {
        let files = graph
            .forward()
            .iter()
            .map(|(path, imports)| {
                let record = FileRecord {
                    mtime: graph.mtime(path).unwrap_or(0.0),
                    imports: imports.clone(),
                };
                (path.clone(), record)
            })
            .collect();
        let runtime_edges = match runtime_edges {
            Some(edges) if !edges.is_empty() => RuntimeEdgesTable::Valid(edges),
            _ => RuntimeEdgesTable::Absent,
        };
        Self {
            built_at,
            files,
            runtime_edges,
        }
    }

    /// The static part as a graph. Runtime edges are not merged here; the
    /// loader does that once the static part has been refreshed.
    pub fn static_graph(&self) -> DependencyGraph {
        let mut forward = ImportMap::new();
        let mut mtimes = BTreeMap::new();
        for (path, record) in &self.files {
            forward.insert(path.clone(), record.imports.clone());
            mtimes.insert(path.clone(), record.mtime);
        }
        DependencyGraph::from_forward(forward, mtimes)
    }

    /// Migrate to the reverse-map form. The runtime edges become the
    /// authoritative reverse map; without any there is nothing trustworthy to
    /// migrate and the result is `None`.
    pub fn into_reverse_map(self) -> Option<ReverseMapSnapshot> {
        match self.runtime_edges {
            RuntimeEdgesTable::Valid(edges) if !edges.is_empty() => Some(ReverseMapSnapshot {
                built_at: self.built_at,
                reverse_map: edges,
            }),
            _ => None,
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        let files = self
            .files
            .iter()
            .map(|(path, record)| {
                let doc = FileDocument {
                    mtime: record.mtime,
                    imports: record.imports.iter().map(|p| path_string(p)).collect(),
                };
                (path_string(path), doc)
            })
            .collect();
        let doc = MtimeDocument {
            version: MTIME_VERSION,
            built_at: self.built_at,
            files,
            runtime_edges: self.runtime_edges.edges().map(encode_map),
        };
        serde_json::to_vec(&doc)
    }
}

impl ReverseMapSnapshot {
    pub fn from_graph(graph: &DependencyGraph, built_at: u64) -> Self {
        Self {
            built_at,
            reverse_map: graph.reverse().clone(),
        }
    }

    pub fn to_graph(&self) -> DependencyGraph {
        DependencyGraph::from_runtime_edges(self.reverse_map.clone())
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        let doc = ReverseMapDocument {
            version: REVERSE_MAP_VERSION,
            built_at: self.built_at,
            reverse_map: encode_map(&self.reverse_map),
        };
        serde_json::to_vec(&doc)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MtimeDocument {
    version: u64,
    built_at: u64,
    files: BTreeMap<String, FileDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime_edges: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Serialize)]
struct FileDocument {
    mtime: f64,
    imports: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReverseMapDocument {
    version: u64,
    built_at: u64,
    reverse_map: BTreeMap<String, Vec<String>>,
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn encode_map(map: &ImportMap) -> BTreeMap<String, Vec<String>> {
    map.iter()
        .map(|(key, values)| (path_string(key), values.iter().map(|v| path_string(v)).collect()))
        .collect()
}

/// Decode and validate a cache file's text.
///
/// Never fails on *which* paths appear: entries whose key or values escape
/// `root` are dropped individually. Fails only on shape.
pub fn decode(text: &str, root: &Path) -> Result<Snapshot, CacheMiss> {
    let mut value: Value =
        serde_json::from_str(text).map_err(|err| CacheMiss::Corrupt(err.to_string()))?;

    let stripped = strip_reserved_keys(&mut value);
    if stripped > 0 {
        debug!(count = stripped, "dropped reserved keys from cache file");
    }

    let Value::Object(top) = value else {
        return Err(CacheMiss::Invalid("top level is not an object".to_string()));
    };

    let version = match top.get("version") {
        Some(v) => v
            .as_u64()
            .ok_or_else(|| CacheMiss::UnknownVersion(v.to_string()))?,
        None => return Err(CacheMiss::UnknownVersion("missing".to_string())),
    };
    let built_at = top.get("builtAt").and_then(Value::as_u64).unwrap_or(0);

    match version {
        MTIME_VERSION => decode_mtime(&top, root, built_at).map(Snapshot::Mtime),
        REVERSE_MAP_VERSION => decode_reverse_map(&top, root, built_at).map(Snapshot::ReverseMap),
        other => Err(CacheMiss::UnknownVersion(other.to_string())),
    }
}

fn decode_mtime(top: &Map<String, Value>, root: &Path, built_at: u64) -> Result<MtimeSnapshot, CacheMiss> {
    let Some(Value::Object(entries)) = top.get("files") else {
        return Err(CacheMiss::Invalid("`files` is not an object".to_string()));
    };

    let mut files = BTreeMap::new();
    let mut dropped = 0usize;

    for (key, entry) in entries {
        let Value::Object(record) = entry else {
            return Err(CacheMiss::Invalid(format!("entry for {key:?} is not an object")));
        };
        let Some(mtime) = record.get("mtime").and_then(Value::as_f64) else {
            return Err(CacheMiss::Invalid(format!("entry for {key:?} has a non-numeric mtime")));
        };
        let Some(raw_imports) = string_array(record.get("imports")) else {
            return Err(CacheMiss::Invalid(format!(
                "entry for {key:?} has imports that are not an array of strings"
            )));
        };

        let Some(path) = confined_path(root, key) else {
            dropped += 1;
            continue;
        };
        let imports: BTreeSet<PathBuf> = raw_imports
            .iter()
            .filter_map(|raw| {
                let confined = confined_path(root, raw);
                if confined.is_none() {
                    dropped += 1;
                }
                confined
            })
            .collect();
        files.insert(path, FileRecord { mtime, imports });
    }

    if dropped > 0 {
        debug!(count = dropped, "dropped cache paths outside the project root");
    }

    let runtime_edges = match top.get("runtimeEdges") {
        None => RuntimeEdgesTable::Absent,
        Some(value) => match decode_edge_map(value, root) {
            Some(edges) => RuntimeEdgesTable::Valid(edges),
            None => {
                debug!("runtime edges table failed validation; merge will be skipped");
                RuntimeEdgesTable::Invalid
            }
        },
    };

    Ok(MtimeSnapshot {
        built_at,
        files,
        runtime_edges,
    })
}

fn decode_reverse_map(
    top: &Map<String, Value>,
    root: &Path,
    built_at: u64,
) -> Result<ReverseMapSnapshot, CacheMiss> {
    let value = top
        .get("reverseMap")
        .ok_or_else(|| CacheMiss::Invalid("`reverseMap` is missing".to_string()))?;
    let reverse_map = decode_edge_map(value, root)
        .ok_or_else(|| CacheMiss::Invalid("`reverseMap` is not an object of string arrays".to_string()))?;
    Ok(ReverseMapSnapshot {
        built_at,
        reverse_map,
    })
}

/// `{ path: [path, ...] }` with confinement applied per key and per value.
/// `None` if the shape is wrong anywhere.
fn decode_edge_map(value: &Value, root: &Path) -> Option<ImportMap> {
    let Value::Object(entries) = value else {
        return None;
    };
    let mut map = ImportMap::new();
    for (key, raw_values) in entries {
        let raw_values = string_array(Some(raw_values))?;
        let Some(path) = confined_path(root, key) else {
            continue;
        };
        let values: BTreeSet<PathBuf> = raw_values
            .iter()
            .filter_map(|raw| confined_path(root, raw))
            .collect();
        if !values.is_empty() {
            map.insert(path, values);
        }
    }
    Some(map)
}

fn string_array(value: Option<&Value>) -> Option<Vec<&str>> {
    let Value::Array(items) = value? else {
        return None;
    };
    items.iter().map(Value::as_str).collect()
}

/// Remove [`RESERVED_KEYS`] from every object in the tree. Returns how many
/// keys were removed.
pub fn strip_reserved_keys(value: &mut Value) -> usize {
    match value {
        Value::Object(map) => {
            let before = map.len();
            map.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));
            let mut removed = before - map.len();
            for child in map.values_mut() {
                removed += strip_reserved_keys(child);
            }
            removed
        }
        Value::Array(items) => items.iter_mut().map(strip_reserved_keys).sum(),
        _ => 0,
    }
}

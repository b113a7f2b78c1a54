// src/loader/runtime.rs

//! Runtime-trusted loading: the persisted reverse map is used without any
//! mtime validation.

use tracing::debug;

use crate::cache::{CacheCodec, CacheMiss, Snapshot};
use crate::graph::GraphBuilder;
use crate::loader::{rebuild, LoadOutcome, LoadResult};

/// - reverse-map snapshot: used as-is;
/// - mtime snapshot with runtime edges: migrated, edges become the map;
/// - anything else: bootstrap from a full static build.
pub fn load_runtime(builder: &GraphBuilder, codec: &CacheCodec) -> LoadResult {
    match codec.load() {
        Ok(Snapshot::ReverseMap(snapshot)) => LoadResult {
            graph: snapshot.to_graph(),
            outcome: LoadOutcome::CacheHit,
            reparsed: 0,
        },
        Ok(Snapshot::Mtime(snapshot)) => match snapshot.into_reverse_map() {
            Some(migrated) => {
                debug!(
                    entries = migrated.reverse_map.len(),
                    "migrating mtime cache to reverse-map form"
                );
                LoadResult {
                    graph: migrated.to_graph(),
                    outcome: LoadOutcome::Migrated,
                    reparsed: 0,
                }
            }
            None => rebuild(builder, CacheMiss::NoRuntimeEdges.to_string()),
        },
        Err(miss) => rebuild(builder, miss.to_string()),
    }
}

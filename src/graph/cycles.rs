// src/graph/cycles.rs

use std::path::{Path, PathBuf};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::graph::ImportMap;

/// Import cycles in `forward`: every strongly connected component with more
/// than one file, plus files that import themselves.
///
/// Purely diagnostic. Traversals do not need this because they carry their
/// own visited sets.
pub fn import_cycles(forward: &ImportMap) -> Vec<Vec<PathBuf>> {
    // Edge direction: importer -> imported.
    let mut graph: DiGraphMap<&Path, ()> = DiGraphMap::new();

    for (importer, imports) in forward {
        graph.add_node(importer.as_path());
        for target in imports {
            graph.add_edge(importer.as_path(), target.as_path(), ());
        }
    }

    let mut cycles: Vec<Vec<PathBuf>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| graph.contains_edge(node, node))
        })
        .map(|component| {
            let mut files: Vec<PathBuf> = component.into_iter().map(Path::to_path_buf).collect();
            files.sort();
            files
        })
        .collect();

    cycles.sort();
    cycles
}

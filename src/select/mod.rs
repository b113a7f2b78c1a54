// src/select/mod.rs

//! Affected test selection: breadth-first search over the reverse graph.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::GlobSet;

use crate::graph::discover::build_globset;
use crate::graph::ImportMap;
use crate::path_utils::relative_str;

/// Test files reachable from `seeds` through `reverse`.
///
/// Seeds are marked visited up front, so a seed is never enqueued twice and
/// cycles terminate. A seed that is itself a test is returned even when the
/// reverse map knows nothing about it. Results are in order of first
/// discovery.
pub fn affected_tests<P, F>(reverse: &ImportMap, seeds: &[P], is_test: F) -> Vec<PathBuf>
where
    P: AsRef<Path>,
    F: Fn(&Path) -> bool,
{
    let mut visited: HashSet<&Path> = HashSet::new();
    let mut queue: VecDeque<&Path> = VecDeque::new();

    for seed in seeds {
        let seed = seed.as_ref();
        if visited.insert(seed) {
            queue.push_back(seed);
        }
    }

    let mut affected = Vec::new();
    while let Some(path) = queue.pop_front() {
        if is_test(path) {
            affected.push(path.to_path_buf());
        }
        let Some(dependents) = reverse.get(path) else {
            continue;
        };
        for dependent in dependents {
            if visited.insert(dependent.as_path()) {
                queue.push_back(dependent.as_path());
            }
        }
    }

    affected
}

/// Classifies test files by glob patterns relative to the project root.
#[derive(Debug, Clone)]
pub struct TestMatcher {
    root: PathBuf,
    set: GlobSet,
}

impl TestMatcher {
    pub fn new(root: impl Into<PathBuf>, patterns: &[String]) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            set: build_globset(patterns)?,
        })
    }

    pub fn is_test(&self, path: &Path) -> bool {
        match relative_str(&self.root, path) {
            Some(rel) => self.set.is_match(rel),
            None => false,
        }
    }
}

// src/watch/filter.rs

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::graph::DependencyGraph;
use crate::select::affected_tests;

#[derive(Debug, Clone)]
struct CachedSelection {
    affected: HashSet<PathBuf>,
    valid_until: Instant,
}

/// Debounced per-test-file predicate for long-lived sessions.
///
/// File-system events only accumulate in `pending`. The first query after
/// the cached selection expires drains them into a single BFS and caches
/// the result until `now + debounce`; every query inside that window reuses
/// it.
///
/// Time is passed in explicitly so the window is testable without sleeping.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    debounce: Duration,
    pending: BTreeSet<PathBuf>,
    cached: Option<CachedSelection>,
    recomputations: usize,
}

impl WatchFilter {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: BTreeSet::new(),
            cached: None,
            recomputations: 0,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Queue a changed (or deleted) path for the next recomputation.
    pub fn record_event(&mut self, path: impl Into<PathBuf>) {
        self.pending.insert(path.into());
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// How many times the selector has run.
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    /// Should `test_file` run for the changes seen so far?
    ///
    /// Paths the graph has never seen are always included.
    pub fn should_include<F>(
        &mut self,
        test_file: &Path,
        graph: &DependencyGraph,
        is_test: F,
        now: Instant,
    ) -> bool
    where
        F: Fn(&Path) -> bool,
    {
        if !graph.knows(test_file) {
            return true;
        }

        let fresh = self
            .cached
            .as_ref()
            .is_some_and(|cached| now < cached.valid_until);
        if !fresh {
            self.recompute(graph, is_test, now);
        }

        self.cached
            .as_ref()
            .is_some_and(|cached| cached.affected.contains(test_file))
    }

    fn recompute<F>(&mut self, graph: &DependencyGraph, is_test: F, now: Instant)
    where
        F: Fn(&Path) -> bool,
    {
        let seeds: Vec<PathBuf> = std::mem::take(&mut self.pending).into_iter().collect();
        let affected = affected_tests(graph.reverse(), &seeds, is_test);
        debug!(
            seeds = seeds.len(),
            affected = affected.len(),
            "recomputed watch selection"
        );
        self.recomputations += 1;
        self.cached = Some(CachedSelection {
            affected: affected.into_iter().collect(),
            valid_until: now + self.debounce,
        });
    }
}

// src/watch/session.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::engine::{Engine, Selection};
use crate::vcs::ChangeSet;
use crate::watch::hash::ContentGate;
use crate::watch::watcher::spawn_watcher;

/// Long-lived session: watch the project, coalesce events that arrive within
/// the debounce window into one batch, refresh the graph for that batch and
/// report the affected tests once per batch. Runs until Ctrl-C.
pub async fn run_watch_session<F>(mut engine: Engine, mut on_batch: F) -> Result<()>
where
    F: FnMut(&ChangeSet, &Selection),
{
    let debounce = Duration::from_millis(engine.config().watch_section().debounce_ms);
    let mut gate = engine.config().watch_section().use_hash.then(|| {
        let mut gate = ContentGate::new();
        for path in engine.graph().forward().keys() {
            gate.prime(engine.fs(), path);
        }
        gate
    });

    let (path_tx, mut path_rx) = mpsc::unbounded_channel::<PathBuf>();
    let _watcher = spawn_watcher(engine.root(), path_tx)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let first = tokio::select! {
            _ = &mut ctrl_c => {
                info!("shutdown requested; stopping watch session");
                break;
            }
            next = path_rx.recv() => match next {
                Some(path) => path,
                None => break,
            },
        };

        let mut batch = BTreeSet::from([first]);
        while let Ok(Some(path)) = timeout(debounce, path_rx.recv()).await {
            batch.insert(path);
        }

        let relevant: Vec<PathBuf> = batch
            .into_iter()
            .filter(|path| engine.rules().is_eligible(path))
            .filter(|path| match gate.as_mut() {
                Some(gate) => gate.has_changed(engine.fs(), path),
                None => true,
            })
            .collect();
        if relevant.is_empty() {
            continue;
        }
        debug!(count = relevant.len(), "processing watch batch");

        engine.refresh_files(&relevant);

        let (changed, deleted): (Vec<PathBuf>, Vec<PathBuf>) = relevant
            .into_iter()
            .partition(|path| engine.fs().exists(path));
        let changes = ChangeSet::new(changed, deleted);
        let selection = engine.select(&changes);
        on_batch(&changes, &selection);
    }

    Ok(())
}

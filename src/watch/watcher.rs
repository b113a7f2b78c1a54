// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::info;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Only content and existence changes matter to the graph.
fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Watch `root` recursively and forward every changed path to `path_tx`.
///
/// Filtering (ignored directories, extensions) and debouncing happen on the
/// receiving side.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    path_tx: mpsc::UnboundedSender<PathBuf>,
) -> Result<WatcherHandle> {
    let root = root.into();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_relevant(&event.kind) {
                    return;
                }
                for path in event.paths {
                    if path_tx.send(path).is_err() {
                        // Receiver gone: the session is shutting down.
                        return;
                    }
                }
            }
            Err(err) => {
                eprintln!("affected: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(root = %root.display(), "file watcher started");

    Ok(WatcherHandle { _inner: watcher })
}

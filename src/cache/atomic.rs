// src/cache/atomic.rs

//! Temp-file-then-rename writes so a reader never sees a half-written cache.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, trace};

use crate::fs::FileSystem;

const TMP_SUFFIX: &str = ".tmp";

/// Temp files younger than this may still be staged by a live writer.
pub const ORPHAN_MIN_AGE_MS: f64 = 60_000.0;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `<dir>/<name>.<pid>.<counter>.tmp`, unique within and across processes.
fn unique_tmp_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("cache path {:?} has no file name", path))?;
    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!("{name}.{}.{counter}{TMP_SUFFIX}", std::process::id());
    Ok(path.with_file_name(tmp_name))
}

/// Write `bytes` to `path` atomically: stage in a unique sibling temp file,
/// then rename over the destination. The temp file is removed if either step
/// fails.
pub fn atomic_write(fs: &dyn FileSystem, path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = unique_tmp_path(path)?;

    if let Err(err) = fs.write(&tmp_path, bytes) {
        remove_best_effort(fs, &tmp_path);
        return Err(err).with_context(|| format!("staging cache write to {:?}", tmp_path));
    }

    if let Err(err) = fs.rename(&tmp_path, path) {
        remove_best_effort(fs, &tmp_path);
        return Err(err).with_context(|| format!("replacing cache file {:?}", path));
    }

    Ok(())
}

/// True if `candidate` looks like a temp file staged for `target`.
pub fn is_tmp_for(target: &Path, candidate: &Path) -> bool {
    let (Some(target_name), Some(name)) = (
        target.file_name().and_then(|n| n.to_str()),
        candidate.file_name().and_then(|n| n.to_str()),
    ) else {
        return false;
    };
    name.len() > target_name.len()
        && name.starts_with(target_name)
        && name[target_name.len()..].starts_with('.')
        && name.ends_with(TMP_SUFFIX)
}

/// Remove temp files left behind by a write that crashed between staging and
/// rename. Only files at least [`ORPHAN_MIN_AGE_MS`] older than `now_ms`
/// count as orphans. Best effort; returns how many were removed.
pub fn sweep_orphans(fs: &dyn FileSystem, target: &Path, now_ms: f64) -> usize {
    let Some(dir) = target.parent() else {
        return 0;
    };
    let Ok(entries) = fs.read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for candidate in entries {
        if !is_tmp_for(target, &candidate) || !fs.is_file(&candidate) {
            continue;
        }
        let stale = fs
            .modified_ms(&candidate)
            .is_ok_and(|mtime| now_ms - mtime >= ORPHAN_MIN_AGE_MS);
        if !stale {
            trace!(path = %candidate.display(), "temp file too recent to sweep");
            continue;
        }
        if remove_best_effort(fs, &candidate) {
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(count = removed, dir = %dir.display(), "swept orphaned cache temp files");
    }
    removed
}

fn remove_best_effort(fs: &dyn FileSystem, path: &Path) -> bool {
    match fs.remove_file(path) {
        Ok(()) => true,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "failed to remove temp file");
            false
        }
    }
}

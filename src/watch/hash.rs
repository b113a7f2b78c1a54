// src/watch/hash.rs

//! Content hashing used to ignore watch events that did not change a file
//! (editors that rewrite on save, `touch`, branch switches back and forth).

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// blake3 hex digest of one file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen content hash per file.
#[derive(Debug, Default)]
pub struct ContentGate {
    hashes: HashMap<PathBuf, String>,
}

impl ContentGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current hash without reporting a change (initial scan).
    pub fn prime(&mut self, fs: &dyn FileSystem, path: &Path) {
        if let Ok(hash) = compute_file_hash(fs, path) {
            self.hashes.insert(path.to_path_buf(), hash);
        }
    }

    /// True if the content of `path` differs from the last time it was seen.
    /// A file that cannot be read (deleted) always counts as changed.
    pub fn has_changed(&mut self, fs: &dyn FileSystem, path: &Path) -> bool {
        match compute_file_hash(fs, path) {
            Ok(hash) => match self.hashes.insert(path.to_path_buf(), hash.clone()) {
                Some(previous) if previous == hash => {
                    debug!(path = %path.display(), "content unchanged; event ignored");
                    false
                }
                _ => true,
            },
            Err(_) => {
                self.hashes.remove(path);
                true
            }
        }
    }
}

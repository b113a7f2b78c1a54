// src/path_utils.rs

//! Utility functions for path handling.
//!
//! File paths are the unit of identity for the whole graph, so every path that
//! enters it (from disk walks, the cache file, host diagnostics or the VCS)
//! passes through these helpers first.

use std::path::{Component, Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be reasonably related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        let s = rel.to_string_lossy().replace('\\', "/");
        return Some(s);
    }

    // Different absolute prefixes may name the same directory
    // (symlinks, /private/var on macOS).
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            let s = rel.to_string_lossy().replace('\\', "/");
            return Some(s);
        }
    }

    None
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// Returns `None` when a `..` would climb above the filesystem root, which
/// only happens for crafted input.
pub fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(name) => out.push(name),
        }
    }
    Some(out)
}

/// Path confinement: true iff `path` is absolute and lies strictly beneath
/// `root` after lexical normalization. `root` itself does not count.
pub fn is_confined(root: &Path, path: &Path) -> bool {
    if !path.is_absolute() {
        return false;
    }
    match normalize_lexically(path) {
        Some(normalized) => normalized != root && normalized.starts_with(root),
        None => false,
    }
}

/// Parse a path string coming from an untrusted source (cache file, host
/// diagnostics) and return its normalized form if it is confined to `root`.
pub fn confined_path(root: &Path, raw: &str) -> Option<PathBuf> {
    let path = Path::new(raw);
    if !is_confined(root, path) {
        return None;
    }
    normalize_lexically(path)
}

/// True if any component of `path` below `root` equals one of `names`.
pub fn has_component_in(root: &Path, path: &Path, names: &[String]) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components().any(|c| match c {
        Component::Normal(name) => names.iter().any(|n| name == n.as_str()),
        _ => false,
    })
}

/// Absolute form of a user-supplied path: canonical when it exists on disk,
/// otherwise joined onto `root` and normalized lexically (deleted files
/// cannot be canonicalized).
pub fn absolutize(root: &Path, path: &Path, canonical: Option<PathBuf>) -> PathBuf {
    if let Some(canonical) = canonical {
        return canonical;
    }
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    normalize_lexically(&joined).unwrap_or(joined)
}

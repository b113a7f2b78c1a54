// src/parse/resolve.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use crate::fs::FileSystem;
use crate::parse::Resolver;
use crate::path_utils::normalize_lexically;

/// Default [`Resolver`]: relative and absolute specifiers only.
///
/// For `./foo` imported from `/p/src` the candidates are, in order:
///
/// 1. `/p/src/foo` as written
/// 2. `/p/src/foo.<ext>` for each configured extension
/// 3. `/p/src/foo.ts` etc. when the specifier ends in `.js`/`.mjs`/`.cjs`
///    (TypeScript sources imported by their emitted name)
/// 4. `/p/src/foo/index.<ext>`
///
/// Bare specifiers (`react`, `node:fs`, `virtual:x`) are left unresolved.
#[derive(Debug, Clone)]
pub struct RelativeResolver {
    fs: Arc<dyn FileSystem>,
    extensions: Vec<String>,
}

impl RelativeResolver {
    pub fn new(fs: Arc<dyn FileSystem>, extensions: Vec<String>) -> Self {
        Self { fs, extensions }
    }

    fn probe(&self, candidate: &Path) -> Option<PathBuf> {
        if self.fs.is_file(candidate) {
            return self.fs.canonicalize(candidate).ok();
        }
        None
    }

    fn with_extensions(&self, base: &Path) -> Option<PathBuf> {
        let base_str = base.as_os_str().to_string_lossy();
        self.extensions
            .iter()
            .find_map(|ext| self.probe(Path::new(&format!("{base_str}.{ext}"))))
    }

    fn emitted_name_to_source(&self, base: &Path) -> Option<PathBuf> {
        let ext = base.extension()?.to_str()?;
        let sources: &[&str] = match ext {
            "js" => &["ts", "tsx"],
            "jsx" => &["tsx"],
            "mjs" => &["mts"],
            "cjs" => &["cts"],
            _ => return None,
        };
        sources
            .iter()
            .find_map(|src| self.probe(&base.with_extension(src)))
    }

    fn directory_index(&self, base: &Path) -> Option<PathBuf> {
        if !self.fs.is_dir(base) {
            return None;
        }
        self.extensions
            .iter()
            .find_map(|ext| self.probe(&base.join(format!("index.{ext}"))))
    }
}

impl Resolver for RelativeResolver {
    fn resolve(&self, from_dir: &Path, specifier: &str) -> Option<PathBuf> {
        let is_path_like =
            specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/');
        if !is_path_like && specifier != "." && specifier != ".." {
            trace!(specifier, "bare specifier left unresolved");
            return None;
        }

        // Query strings and hashes (`./worker.js?worker`) never name files.
        let path_part = specifier
            .split(['?', '#'])
            .next()
            .unwrap_or(specifier);

        let base = normalize_lexically(&from_dir.join(path_part))?;

        self.probe(&base)
            .or_else(|| self.with_extensions(&base))
            .or_else(|| self.emitted_name_to_source(&base))
            .or_else(|| self.directory_index(&base))
    }
}

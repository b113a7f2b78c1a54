// src/parse/mod.rs

//! Seams to the source-text import parser and the module resolver.
//!
//! The graph builder only needs two functions:
//!
//! - `extract_imports(path, text) -> [specifier]`
//! - `resolve(from_dir, specifier) -> path | unresolved`
//!
//! Both are traits with blanket impls for closures, so a host can plug in its
//! own toolchain. [`EsImportParser`] and [`RelativeResolver`] are the defaults
//! used by the binary.

use std::path::{Path, PathBuf};

pub mod imports;
pub mod resolve;

pub use imports::EsImportParser;
pub use resolve::RelativeResolver;

/// Extracts the import specifiers of one source file.
///
/// Implementations should already leave out type-only imports and dynamic
/// imports whose argument is not a literal.
pub trait ImportParser: Send + Sync {
    fn extract_imports(&self, path: &Path, text: &str) -> Vec<String>;
}

impl<F> ImportParser for F
where
    F: Fn(&Path, &str) -> Vec<String> + Send + Sync,
{
    fn extract_imports(&self, path: &Path, text: &str) -> Vec<String> {
        self(path, text)
    }
}

/// Maps a specifier, as written in a file living in `from_dir`, to a file.
///
/// `None` means unresolved (bare package specifier, virtual module, missing
/// file); the builder drops those edges.
pub trait Resolver: Send + Sync {
    fn resolve(&self, from_dir: &Path, specifier: &str) -> Option<PathBuf>;
}

impl<F> Resolver for F
where
    F: Fn(&Path, &str) -> Option<PathBuf> + Send + Sync,
{
    fn resolve(&self, from_dir: &Path, specifier: &str) -> Option<PathBuf> {
        self(from_dir, specifier)
    }
}

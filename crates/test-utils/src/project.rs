#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use affected::cache::CacheCodec;
use affected::config::{ConfigFile, DEFAULT_CACHE_PATH};
use affected::engine::Engine;
use affected::fs::mock::MockFileSystem;
use affected::fs::FileSystem;
use affected::graph::{GraphBuilder, IgnoreRules};
use affected::parse::{EsImportParser, ImportParser, RelativeResolver, Resolver};
use tempfile::TempDir;

pub const MOCK_ROOT: &str = "/proj";

/// In-memory project rooted at [`MOCK_ROOT`].
///
/// ```ignore
/// let p = MockProject::new();
/// p.file("src/a.ts", "import './b'");
/// let graph = p.builder().build();
/// ```
#[derive(Debug, Clone)]
pub struct MockProject {
    pub fs: MockFileSystem,
    root: PathBuf,
}

impl MockProject {
    pub fn new() -> Self {
        let fs = MockFileSystem::new();
        fs.add_dir(MOCK_ROOT);
        Self {
            fs,
            root: PathBuf::from(MOCK_ROOT),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `rel`.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Create or overwrite `rel`; each write gets a fresh mtime.
    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        self.fs.add_file(&path, content);
        path
    }

    pub fn remove(&self, rel: &str) {
        self.fs
            .remove_file(&self.path(rel))
            .expect("removing mock file");
    }

    pub fn fs_arc(&self) -> Arc<dyn FileSystem> {
        Arc::new(self.fs.clone())
    }

    pub fn builder_with(&self, config: &ConfigFile) -> GraphBuilder {
        let fs = self.fs_arc();
        let rules = IgnoreRules::from_config(&self.root, config.graph_section())
            .expect("building ignore rules");
        let parser: Arc<dyn ImportParser> =
            Arc::new(EsImportParser::new().expect("compiling import parser"));
        let resolver: Arc<dyn Resolver> = Arc::new(RelativeResolver::new(
            Arc::clone(&fs),
            config.graph_section().extensions.clone(),
        ));
        GraphBuilder::new(fs, rules, parser, resolver)
    }

    pub fn builder(&self) -> GraphBuilder {
        self.builder_with(&ConfigFile::default())
    }

    pub fn codec(&self) -> CacheCodec {
        CacheCodec::new(self.fs_arc(), &self.root, Path::new(DEFAULT_CACHE_PATH))
    }

    pub fn cache_path(&self) -> PathBuf {
        self.path(DEFAULT_CACHE_PATH)
    }

    pub fn engine(&self, config: ConfigFile) -> Engine {
        let fs = self.fs_arc();
        let parser: Arc<dyn ImportParser> =
            Arc::new(EsImportParser::new().expect("compiling import parser"));
        let resolver: Arc<dyn Resolver> = Arc::new(RelativeResolver::new(
            Arc::clone(&fs),
            config.graph_section().extensions.clone(),
        ));
        Engine::open(self.root.clone(), config, fs, parser, resolver).expect("opening engine")
    }
}

impl Default for MockProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Project in a real temporary directory (removed on drop).
#[derive(Debug)]
pub struct TempProject {
    dir: TempDir,
    root: PathBuf,
}

impl TempProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("creating temp dir");
        let root = dir.path().canonicalize().expect("canonicalizing temp dir");
        Self { dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("creating parent dirs");
        }
        std::fs::write(&path, content).expect("writing file");
        path
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.path(rel)).expect("removing file");
    }

    pub fn engine(&self, config: ConfigFile) -> Engine {
        Engine::open_default(&self.root, config).expect("opening engine")
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}

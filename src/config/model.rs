// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{GraphMode, ZeroAffectedPolicy};

/// Relative path (from the project root) of the persisted dependency graph.
pub const DEFAULT_CACHE_PATH: &str = ".affected/graph.json";

/// Top-level configuration as read from `affected.toml`.
///
/// ```toml
/// [config]
/// cache = true
/// on_zero_affected = "all"
///
/// [graph]
/// ignore = ["scripts/**"]
/// test_patterns = ["**/*.test.ts"]
///
/// [watch]
/// debounce_ms = 300
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unvalidated form; use `ConfigFile::try_from` (or the loader) to get a
/// checked [`ConfigFile`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub graph: GraphSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    graph: GraphSection,
    watch: WatchSection,
}

impl ConfigFile {
    /// Wrap already-validated sections. Only `validate.rs` should call this.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        graph: GraphSection,
        watch: WatchSection,
    ) -> Self {
        Self {
            config,
            graph,
            watch,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn graph_section(&self) -> &GraphSection {
        &self.graph
    }

    pub fn watch_section(&self) -> &WatchSection {
        &self.watch
    }

    /// Override the cache toggle (e.g. from `--no-cache`).
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.config.cache = enabled;
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.config, raw.graph, raw.watch)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Cache on/off toggle. With the cache off every invocation does a full
    /// build and nothing is persisted.
    #[serde(default = "default_true")]
    pub cache: bool,

    /// Location of the cache file, relative to the project root.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Which cache form to trust (`"static"` or `"runtime"`).
    #[serde(default)]
    pub mode: GraphMode,

    /// `"none"` (run nothing) or `"all"` (fall back to the full suite).
    #[serde(default)]
    pub on_zero_affected: ZeroAffectedPolicy,

    /// Verbose diagnostic logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_true() -> bool {
    true
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_PATH)
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            cache: true,
            cache_path: default_cache_path(),
            mode: GraphMode::default(),
            on_zero_affected: ZeroAffectedPolicy::default(),
            verbose: false,
        }
    }
}

/// `[graph]` section: what the graph builder walks and what counts as a test.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSection {
    /// Source file extensions (without the dot). Imports resolving to any
    /// other extension are treated as assets and dropped.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names skipped wherever they appear (dependency managers,
    /// build output, fixture directories).
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,

    /// Extra glob patterns, relative to the root, excluded from the graph.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Directory names that hold third-party packages. Runtime-observed
    /// loads from inside these are never recorded.
    #[serde(default = "default_dependency_dirs")]
    pub dependency_dirs: Vec<String>,

    /// Globs (relative to the root) identifying test files.
    #[serde(default = "default_test_patterns")]
    pub test_patterns: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignore_dirs() -> Vec<String> {
    [
        "node_modules",
        ".git",
        "dist",
        "build",
        "coverage",
        "__fixtures__",
        "fixtures",
        ".affected",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_dependency_dirs() -> Vec<String> {
    vec!["node_modules".to_string()]
}

fn default_test_patterns() -> Vec<String> {
    ["**/*.test.*", "**/*.spec.*", "**/__tests__/**"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignore_dirs: default_ignore_dirs(),
            ignore: Vec::new(),
            dependency_dirs: default_dependency_dirs(),
            test_patterns: default_test_patterns(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Events closer together than this are handled as one batch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Only react to events whose file content hash actually changed.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            use_hash: false,
        }
    }
}

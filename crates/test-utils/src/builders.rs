#![allow(dead_code)]

use affected::config::{ConfigFile, RawConfigFile};
use affected::types::{GraphMode, ZeroAffectedPolicy};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.config.config.cache = enabled;
        self
    }

    pub fn with_cache_path(mut self, path: &str) -> Self {
        self.config.config.cache_path = path.into();
        self
    }

    pub fn with_mode(mut self, mode: GraphMode) -> Self {
        self.config.config.mode = mode;
        self
    }

    pub fn with_on_zero_affected(mut self, policy: ZeroAffectedPolicy) -> Self {
        self.config.config.on_zero_affected = policy;
        self
    }

    pub fn with_ignore(mut self, pattern: &str) -> Self {
        self.config.graph.ignore.push(pattern.to_string());
        self
    }

    pub fn with_ignore_dir(mut self, name: &str) -> Self {
        self.config.graph.ignore_dirs.push(name.to_string());
        self
    }

    pub fn with_test_patterns(mut self, patterns: &[&str]) -> Self {
        self.config.graph.test_patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn with_use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

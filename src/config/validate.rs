// src/config/validate.rs

use std::path::Component;

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AffectedError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AffectedError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.graph, raw.watch))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_cache_path(cfg)?;
    validate_graph_section(cfg)?;
    validate_watch_section(cfg)?;
    Ok(())
}

fn validate_cache_path(cfg: &RawConfigFile) -> Result<()> {
    let path = &cfg.config.cache_path;
    if path.as_os_str().is_empty() {
        return Err(AffectedError::ConfigError(
            "[config].cache_path must not be empty".to_string(),
        ));
    }
    if path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(AffectedError::ConfigError(format!(
            "[config].cache_path must be relative to the project root and stay inside it (got {:?})",
            path
        )));
    }
    Ok(())
}

fn validate_graph_section(cfg: &RawConfigFile) -> Result<()> {
    let graph = &cfg.graph;

    if graph.extensions.is_empty() {
        return Err(AffectedError::ConfigError(
            "[graph].extensions must list at least one source extension".to_string(),
        ));
    }
    if let Some(bad) = graph.extensions.iter().find(|e| e.starts_with('.') || e.is_empty()) {
        return Err(AffectedError::ConfigError(format!(
            "[graph].extensions entries are written without the leading dot (got {:?})",
            bad
        )));
    }

    for pattern in graph.ignore.iter().chain(graph.test_patterns.iter()) {
        Glob::new(pattern)?;
    }
    Ok(())
}

fn validate_watch_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.debounce_ms == 0 {
        return Err(AffectedError::ConfigError(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

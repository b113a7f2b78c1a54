use std::str::FromStr;

use serde::Deserialize;

/// What to do when a selection finds no affected tests.
///
/// - `None`: run nothing (default).
/// - `All`: fall back to the full suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroAffectedPolicy {
    None,
    All,
}

impl Default for ZeroAffectedPolicy {
    fn default() -> Self {
        ZeroAffectedPolicy::None
    }
}

impl FromStr for ZeroAffectedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(ZeroAffectedPolicy::None),
            "all" => Ok(ZeroAffectedPolicy::All),
            other => Err(format!(
                "invalid on_zero_affected: {other} (expected \"none\" or \"all\")"
            )),
        }
    }
}

/// Where the reverse graph comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphMode {
    /// Static import analysis validated by file mtimes, enriched with runtime
    /// edges (`files` + `runtimeEdges` cache form).
    Static,
    /// Runtime-observed reverse map trusted as-is (`reverseMap` cache form).
    Runtime,
}

impl Default for GraphMode {
    fn default() -> Self {
        GraphMode::Static
    }
}

/// How a host test run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Interrupted,
}

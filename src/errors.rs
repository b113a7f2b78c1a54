// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Cache and parse problems never show up here: they degrade to a rebuild
//! inside the loader. These variants cover configuration, VCS and I/O at the
//! edges of the program.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AffectedError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid glob pattern: {0}")]
    GlobError(#[from] globset::Error),

    #[error("VCS error: {0}")]
    VcsError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AffectedError>;

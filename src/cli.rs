// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `affected`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "affected",
    version,
    about = "Print the test files affected by a set of changed source files.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `affected.toml` in the project root. A missing file means
    /// built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project root. Default: the current working directory.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Changed file (repeatable). Bypasses git entirely.
    #[arg(long = "changed", value_name = "FILE")]
    pub changed: Vec<PathBuf>,

    /// Git revision to diff against. Default: HEAD.
    #[arg(long, value_name = "REF", conflicts_with = "changed")]
    pub base: Option<String>,

    /// Ignore and do not write the graph cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Keep running and print the affected tests for every batch of changes.
    #[arg(long)]
    pub watch: bool,

    /// Print a summary of the dependency graph and exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose diagnostics (same as `--log-level debug`).
    #[arg(long, short)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `AFFECTED_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

// src/lib.rs

pub mod cache;
pub mod cli;
pub mod collect;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod graph;
pub mod loader;
pub mod logging;
pub mod parse;
pub mod path_utils;
pub mod select;
pub mod types;
pub mod vcs;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_or_default, ConfigFile};
use crate::engine::{Engine, Selection};
use crate::vcs::{ChangeSource, ExplicitChanges, GitChangeSource};

/// Project root from `--root`, else the current working directory.
pub fn project_root(args: &CliArgs) -> Result<PathBuf> {
    let root = match &args.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("reading current directory")?,
    };
    root.canonicalize()
        .with_context(|| format!("project root {:?} does not exist", root))
}

/// Load `--config` (or `<root>/affected.toml`) and apply CLI overrides.
pub fn load_config(args: &CliArgs, root: &Path) -> Result<ConfigFile> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => root.join(default_config_path()),
    };
    let mut cfg = load_or_default(&path)
        .with_context(|| format!("loading config from {:?}", path))?;
    if args.no_cache {
        cfg.set_cache_enabled(false);
    }
    if args.verbose {
        cfg.set_verbose(true);
    }
    Ok(cfg)
}

/// High-level entry point used by `main.rs`.
///
/// - `--dry-run`: print a graph summary;
/// - `--watch`: run a watch session until Ctrl-C;
/// - otherwise: collect changes (explicit list or git), print the affected
///   test files one per line.
pub async fn run(args: CliArgs, root: PathBuf, cfg: ConfigFile) -> Result<()> {
    let engine = Engine::open_default(&root, cfg)?;

    if args.dry_run {
        print_dry_run(&engine);
        return Ok(());
    }

    if args.watch {
        return watch::run_watch_session(engine, |changes, selection| {
            println!("# {} changed file(s)", changes.len());
            print_selection(selection);
        })
        .await;
    }

    let changes = if args.changed.is_empty() {
        GitChangeSource::new().changes(&root, args.base.as_deref())?
    } else {
        ExplicitChanges::new(args.changed.iter().cloned()).changes(&root, None)?
    };
    debug!(
        changed = changes.changed.len(),
        deleted = changes.deleted.len(),
        "collected changes"
    );

    let selection = engine.select(&changes);
    print_selection(&selection);
    Ok(())
}

fn print_selection(selection: &Selection) {
    if selection.is_full_suite() {
        debug!("printing the full suite");
    }
    for path in selection.paths() {
        println!("{}", path.display());
    }
}

/// Graph summary: sizes, cache outcome, tests and import cycles.
fn print_dry_run(engine: &Engine) {
    let graph = engine.graph();
    let tests = engine.all_tests();
    let cycles = engine.cycles();

    println!("affected dry-run");
    println!("  root = {}", engine.root().display());
    println!("  graph = {}", engine.outcome());
    println!("  files = {}", graph.file_count());
    println!("  edges = {}", graph.edge_count());
    println!("  runtime edge keys = {}", graph.runtime_edges().len());
    println!("  tests = {}", tests.len());
    println!();

    println!("import cycles ({}):", cycles.len());
    for cycle in &cycles {
        let names: Vec<String> = cycle
            .iter()
            .map(|p| {
                path_utils::relative_str(engine.root(), p)
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect();
        println!("  - {}", names.join(" -> "));
    }

    debug!("dry-run complete (no selection)");
}

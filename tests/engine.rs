use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

use affected::collect::{ModuleDiagnostics, ModuleTiming};
use affected::config::ConfigFile;
use affected::engine::Selection;
use affected::fs::FileSystem;
use affected::loader::LoadOutcome;
use affected::types::{GraphMode, RunStatus, ZeroAffectedPolicy};
use affected::vcs::ChangeSet;
use affected_test_utils::{init_tracing, ConfigFileBuilder, MockProject, TempProject};

type TestResult = Result<(), Box<dyn Error>>;

fn project() -> MockProject {
    let p = MockProject::new();
    p.file("src/a.ts", "import { b } from './b';");
    p.file("src/b.ts", "import { c } from './c';");
    p.file("src/c.ts", "export const c = 1;");
    p.file("src/hidden.ts", "export const cfg = {};");
    p.file("src/a.test.ts", "import { a } from './a';");
    p.file("src/other.test.ts", "");
    p
}

fn changed(paths: &[PathBuf]) -> ChangeSet {
    ChangeSet::new(paths.to_vec(), Vec::new())
}

fn loaded(paths: &[PathBuf]) -> ModuleDiagnostics {
    paths
        .iter()
        .map(|p| (p.to_string_lossy().into_owned(), ModuleTiming::default()))
        .collect::<BTreeMap<_, _>>()
}

#[test]
fn selects_transitive_dependents() -> TestResult {
    init_tracing();
    let p = project();
    let engine = p.engine(ConfigFile::default());

    assert!(matches!(engine.outcome(), LoadOutcome::Rebuilt { .. }));
    let selection = engine.select(&changed(&[p.path("src/c.ts")]));
    assert_eq!(selection, Selection::Tests(vec![p.path("src/a.test.ts")]));
    Ok(())
}

#[test]
fn second_open_is_a_cache_hit() -> TestResult {
    let p = project();
    drop(p.engine(ConfigFile::default()));
    assert!(p.fs.exists(&p.cache_path()));

    let engine = p.engine(ConfigFile::default());
    assert_eq!(engine.outcome(), &LoadOutcome::CacheHit);
    assert_eq!(engine.graph().file_count(), 6);
    Ok(())
}

#[test]
fn zero_affected_policy() -> TestResult {
    let p = project();
    let seeds = changed(&[p.path("src/hidden.ts")]);

    let none = p.engine(ConfigFile::default());
    assert_eq!(none.select(&seeds), Selection::Tests(Vec::new()));

    let config = ConfigFileBuilder::new()
        .with_on_zero_affected(ZeroAffectedPolicy::All)
        .build();
    let all = p.engine(config);
    let selection = all.select(&seeds);
    assert!(selection.is_full_suite());
    assert_eq!(
        selection.paths(),
        &[p.path("src/a.test.ts"), p.path("src/other.test.ts")]
    );
    Ok(())
}

#[test]
fn deleted_file_still_selects_former_importers() -> TestResult {
    let p = project();
    drop(p.engine(ConfigFile::default()));
    p.remove("src/c.ts");

    let engine = p.engine(ConfigFile::default());
    let selection = engine.select(&ChangeSet::new(Vec::new(), vec![p.path("src/c.ts")]));
    assert_eq!(selection.paths(), &[p.path("src/a.test.ts")]);
    Ok(())
}

#[test]
fn runtime_edges_from_collector_reach_next_selection() -> TestResult {
    let p = project();
    let test = p.path("src/other.test.ts");
    {
        let engine = p.engine(ConfigFile::default());
        let mut collector = engine.runtime_collector();
        collector.on_run_start();
        collector.on_test_module_end(&test, &loaded(&[p.path("src/hidden.ts")]));
        assert!(collector.on_run_end(RunStatus::Completed));
    }

    let engine = p.engine(ConfigFile::default());
    assert_eq!(engine.outcome(), &LoadOutcome::CacheHit);
    let selection = engine.select(&changed(&[p.path("src/hidden.ts")]));
    assert_eq!(selection, Selection::Tests(vec![test.clone()]));

    // A static edit elsewhere keeps the runtime edge.
    p.file("src/b.ts", "export const b = 2;");
    let engine = p.engine(ConfigFile::default());
    assert!(matches!(engine.outcome(), LoadOutcome::Refreshed { .. }));
    let selection = engine.select(&changed(&[p.path("src/hidden.ts")]));
    assert_eq!(selection, Selection::Tests(vec![test]));
    Ok(())
}

#[test]
fn runtime_mode_round_trip() -> TestResult {
    let p = project();
    let config = || ConfigFileBuilder::new().with_mode(GraphMode::Runtime).build();
    let test = p.path("src/other.test.ts");
    {
        let engine = p.engine(config());
        assert!(matches!(engine.outcome(), LoadOutcome::Rebuilt { .. }));
        let mut collector = engine.runtime_collector();
        collector.on_test_module_end(&test, &loaded(&[p.path("src/hidden.ts")]));
        collector.on_run_end(RunStatus::Completed);
    }

    let engine = p.engine(config());
    assert_eq!(engine.outcome(), &LoadOutcome::CacheHit);
    let selection = engine.select(&changed(&[p.path("src/hidden.ts"), p.path("src/c.ts")]));
    assert_eq!(
        selection,
        Selection::Tests(vec![test, p.path("src/a.test.ts")])
    );
    Ok(())
}

#[test]
fn cache_disabled_builds_fresh_and_writes_nothing() -> TestResult {
    let p = project();
    let config = || ConfigFileBuilder::new().with_cache(false).build();

    let engine = p.engine(config());
    assert_eq!(
        engine.outcome(),
        &LoadOutcome::Rebuilt {
            reason: "cache disabled".to_string()
        }
    );
    let mut collector = engine.runtime_collector();
    collector.on_test_module_end(&p.path("src/other.test.ts"), &loaded(&[p.path("src/hidden.ts")]));
    assert!(collector.on_run_end(RunStatus::Completed));

    assert!(!p.fs.exists(&p.cache_path()));
    let engine = p.engine(config());
    assert!(matches!(engine.outcome(), LoadOutcome::Rebuilt { .. }));
    Ok(())
}

#[test]
fn refresh_files_updates_live_graph_and_cache() -> TestResult {
    let p = project();
    let mut engine = p.engine(ConfigFile::default());

    let a = p.file("src/a.ts", "import './hidden';");
    engine.refresh_files(&[a]);
    let selection = engine.select(&changed(&[p.path("src/hidden.ts")]));
    assert_eq!(selection.paths(), &[p.path("src/a.test.ts")]);
    assert!(engine.select(&changed(&[p.path("src/c.ts")])).paths().is_empty());

    let reopened = p.engine(ConfigFile::default());
    assert_eq!(reopened.outcome(), &LoadOutcome::CacheHit);
    Ok(())
}

#[test]
fn reports_cycles_and_tests() -> TestResult {
    let p = MockProject::new();
    p.file("x.ts", "import './y';");
    p.file("y.ts", "import './x';");
    p.file("x.test.ts", "import './x';");
    let engine = p.engine(ConfigFile::default());

    assert_eq!(engine.cycles(), vec![vec![p.path("x.ts"), p.path("y.ts")]]);
    assert_eq!(engine.all_tests(), vec![p.path("x.test.ts")]);
    let selection = engine.select(&changed(&[p.path("y.ts")]));
    assert_eq!(selection.paths(), &[p.path("x.test.ts")]);
    Ok(())
}

#[test]
fn real_filesystem_project() -> TestResult {
    let p = TempProject::new();
    p.write("src/util.ts", "export const u = 1;");
    p.write("src/index.ts", "export * from './util.js';");
    p.write("src/index.test.ts", "import { u } from './index';");
    p.write("node_modules/dep/index.js", "module.exports = 1;");

    let engine = p.engine(ConfigFile::default());
    assert_eq!(engine.graph().file_count(), 3);
    let selection = engine.select(&changed(&[p.path("src/util.ts")]));
    assert_eq!(selection.paths(), &[p.path("src/index.test.ts")]);
    assert!(p.path(affected::config::DEFAULT_CACHE_PATH).is_file());

    let engine = p.engine(ConfigFile::default());
    assert_eq!(engine.outcome(), &LoadOutcome::CacheHit);
    Ok(())
}

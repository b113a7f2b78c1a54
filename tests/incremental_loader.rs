use std::collections::BTreeSet;
use std::error::Error;
use std::path::PathBuf;

use affected::cache::{RuntimeEdgesTable, Snapshot};
use affected::fs::FileSystem;
use affected::graph::ImportMap;
use affected::loader::{IncrementalLoader, LoadOutcome};
use affected::types::GraphMode;
use affected_test_utils::{init_tracing, ConfigFileBuilder, MockProject};

type TestResult = Result<(), Box<dyn Error>>;

fn project() -> MockProject {
    let p = MockProject::new();
    p.file("src/a.ts", "import './b';");
    p.file("src/b.ts", "import './c';");
    p.file("src/c.ts", "");
    p.file("src/a.test.ts", "import './a';");
    p
}

fn single(key: PathBuf, value: PathBuf) -> ImportMap {
    let mut map = ImportMap::new();
    map.insert(key, BTreeSet::from([value]));
    map
}

/// Load once (cold) and persist, like a first invocation.
fn warm(p: &MockProject) {
    let builder = p.builder();
    let codec = p.codec();
    let loader = IncrementalLoader::new(&builder, &codec);
    let result = loader.load(GraphMode::Static);
    loader.persist(GraphMode::Static, &result).expect("persist");
}

#[test]
fn cold_start_rebuilds_then_second_run_hits() -> TestResult {
    init_tracing();
    let p = project();
    let builder = p.builder();
    let codec = p.codec();
    let loader = IncrementalLoader::new(&builder, &codec);

    let first = loader.load(GraphMode::Static);
    assert!(matches!(first.outcome, LoadOutcome::Rebuilt { .. }));
    assert_eq!(first.reparsed, 4);
    loader.persist(GraphMode::Static, &first)?;

    let parses_before = builder.parse_count();
    let second = loader.load(GraphMode::Static);
    assert_eq!(second.outcome, LoadOutcome::CacheHit);
    assert_eq!(second.reparsed, 0);
    assert_eq!(builder.parse_count(), parses_before);
    assert_eq!(second.graph.forward(), first.graph.forward());
    assert_eq!(second.graph.reverse(), first.graph.reverse());
    Ok(())
}

#[test]
fn changed_file_is_reparsed_alone() -> TestResult {
    let p = project();
    warm(&p);

    let d = p.file("src/d.ts", "");
    p.file("src/b.ts", "import './d';");

    let builder = p.builder();
    let codec = p.codec();
    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Static);

    assert_eq!(
        result.outcome,
        LoadOutcome::Refreshed {
            changed: 1,
            added: 1,
            deleted: 0
        }
    );
    assert_eq!(result.reparsed, 2);
    assert_eq!(builder.parse_count(), 2);
    assert_eq!(result.graph.imports_of(&p.path("src/b.ts")), Some(&BTreeSet::from([d.clone()])));
    assert_eq!(result.graph.dependents_of(&p.path("src/c.ts")), None);
    assert_eq!(
        result.graph.dependents_of(&d),
        Some(&BTreeSet::from([p.path("src/b.ts")]))
    );
    Ok(())
}

#[test]
fn touch_without_content_change_still_counts_as_changed() -> TestResult {
    let p = project();
    warm(&p);
    p.fs.touch(p.path("src/c.ts"));

    let builder = p.builder();
    let codec = p.codec();
    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Static);

    assert_eq!(
        result.outcome,
        LoadOutcome::Refreshed {
            changed: 1,
            added: 0,
            deleted: 0
        }
    );
    assert_eq!(result.reparsed, 1);
    Ok(())
}

#[test]
fn deleted_file_leaves_forward_graph() -> TestResult {
    let p = project();
    warm(&p);
    p.remove("src/c.ts");

    let builder = p.builder();
    let codec = p.codec();
    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Static);

    assert_eq!(
        result.outcome,
        LoadOutcome::Refreshed {
            changed: 0,
            added: 0,
            deleted: 1
        }
    );
    assert_eq!(result.reparsed, 0);
    assert!(result.graph.imports_of(&p.path("src/c.ts")).is_none());
    // b still imports c until b itself changes, so c still reaches b.
    assert_eq!(
        result.graph.dependents_of(&p.path("src/c.ts")),
        Some(&BTreeSet::from([p.path("src/b.ts")]))
    );
    Ok(())
}

#[test]
fn new_files_in_ignored_directories_are_never_added() -> TestResult {
    let p = project();
    warm(&p);
    p.file("node_modules/lib/index.js", "module.exports = {}");
    p.file("src/__fixtures__/sample.ts", "export {}");
    p.file("fixtures/data.ts", "export {}");
    p.file("src/notes.md", "# notes");

    let builder = p.builder();
    let codec = p.codec();
    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Static);

    assert_eq!(result.outcome, LoadOutcome::CacheHit);
    assert_eq!(result.graph.file_count(), 4);

    // A file elsewhere under the root is picked up without a rebuild.
    let fresh = p.file("lib/fresh.ts", "");
    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Static);
    assert_eq!(
        result.outcome,
        LoadOutcome::Refreshed {
            changed: 0,
            added: 1,
            deleted: 0
        }
    );
    assert!(result.graph.imports_of(&fresh).is_some());
    Ok(())
}

#[test]
fn files_that_became_ignored_count_as_deleted() -> TestResult {
    let p = project();
    warm(&p);

    let config = ConfigFileBuilder::new().with_ignore("src/c.ts").build();
    let builder = p.builder_with(&config);
    let codec = p.codec();
    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Static);

    assert_eq!(
        result.outcome,
        LoadOutcome::Refreshed {
            changed: 0,
            added: 0,
            deleted: 1
        }
    );
    Ok(())
}

#[test]
fn reparse_count_is_bounded_by_changes() -> TestResult {
    let p = MockProject::new();
    for i in 0..60 {
        let next = i + 1;
        p.file(&format!("src/m{i}.ts"), &format!("import './m{next}';"));
    }
    p.file("src/m60.ts", "");
    warm(&p);

    p.file("src/m10.ts", "import './m11';\nimport './m12';");
    p.file("src/m20.ts", "");
    p.file("src/extra.ts", "import './m1';");

    let builder = p.builder();
    let codec = p.codec();
    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Static);

    assert_eq!(result.reparsed, 3);
    assert_eq!(builder.parse_count(), 3);
    assert_eq!(result.graph.file_count(), 62);
    Ok(())
}

#[test]
fn schema_violation_forces_exactly_one_rebuild() -> TestResult {
    let p = project();
    p.fs.add_file(
        p.cache_path(),
        r#"{"version":1,"builtAt":0,"files":{"/proj/src/a.ts":{"mtime":"soon","imports":[]}}}"#,
    );

    let builder = p.builder();
    let codec = p.codec();
    let loader = IncrementalLoader::new(&builder, &codec);
    let result = loader.load(GraphMode::Static);

    assert!(matches!(result.outcome, LoadOutcome::Rebuilt { .. }));
    assert_eq!(builder.parse_count(), 4);
    assert_eq!(result.graph.file_count(), 4);

    loader.persist(GraphMode::Static, &result)?;
    let again = loader.load(GraphMode::Static);
    assert_eq!(again.outcome, LoadOutcome::CacheHit);
    assert_eq!(builder.parse_count(), 4);
    Ok(())
}

#[test]
fn rebuild_discards_persisted_runtime_edges() -> TestResult {
    let p = project();
    let builder = p.builder();
    let codec = p.codec();
    let graph = builder.build();
    codec.save_mtime(&graph, Some(&single(p.path("src/c.ts"), p.path("src/a.test.ts"))))?;

    // Corrupt the static part only.
    let text = p.fs.read_to_string(&p.cache_path())?;
    p.fs.add_file(p.cache_path(), text.replace("\"mtime\":", "\"mtime\":\"x\",\"was\":"));

    let loader = IncrementalLoader::new(&builder, &codec);
    let result = loader.load(GraphMode::Static);
    assert!(matches!(result.outcome, LoadOutcome::Rebuilt { .. }));
    assert!(result.graph.runtime_edges().is_empty());

    loader.persist(GraphMode::Static, &result)?;
    let Ok(Snapshot::Mtime(snapshot)) = codec.load() else {
        panic!("expected mtime snapshot");
    };
    assert_eq!(snapshot.runtime_edges, RuntimeEdgesTable::Absent);
    Ok(())
}

#[test]
fn runtime_edges_are_merged_into_reverse_graph() -> TestResult {
    let p = project();
    let hidden = p.file("src/hidden.ts", "");
    warm(&p);
    let test = p.path("src/a.test.ts");
    p.codec().merge_runtime_edges(&single(hidden.clone(), test.clone()))?;

    let builder = p.builder();
    let codec = p.codec();
    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Static);

    assert_eq!(result.outcome, LoadOutcome::CacheHit);
    assert_eq!(result.graph.dependents_of(&hidden), Some(&BTreeSet::from([test])));
    Ok(())
}

#[test]
fn invalid_runtime_table_skips_merge_but_keeps_static_graph() -> TestResult {
    let p = project();
    warm(&p);
    let text = p.fs.read_to_string(&p.cache_path())?;
    let mut doc: serde_json::Value = serde_json::from_str(&text)?;
    doc["runtimeEdges"] = serde_json::json!({"/proj/src/c.ts": "not-an-array"});
    p.fs.add_file(p.cache_path(), doc.to_string());

    let builder = p.builder();
    let codec = p.codec();
    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Static);

    assert_eq!(result.outcome, LoadOutcome::CacheHit);
    assert_eq!(builder.parse_count(), 0);
    assert_eq!(result.graph.file_count(), 4);
    assert!(result.graph.runtime_edges().is_empty());
    Ok(())
}

#[test]
fn refresh_persist_keeps_runtime_edges() -> TestResult {
    let p = project();
    warm(&p);
    let edges = single(p.path("src/c.ts"), p.path("src/a.test.ts"));
    p.codec().merge_runtime_edges(&edges)?;

    p.file("src/b.ts", "import './c';\n// edited");
    let builder = p.builder();
    let codec = p.codec();
    let loader = IncrementalLoader::new(&builder, &codec);
    let result = loader.load(GraphMode::Static);
    assert!(matches!(result.outcome, LoadOutcome::Refreshed { .. }));
    loader.persist(GraphMode::Static, &result)?;

    let Ok(Snapshot::Mtime(snapshot)) = codec.load() else {
        panic!("expected mtime snapshot");
    };
    assert_eq!(snapshot.runtime_edges, RuntimeEdgesTable::Valid(edges));
    Ok(())
}

#[test]
fn reverse_map_cache_is_a_miss_in_static_mode() -> TestResult {
    let p = project();
    let builder = p.builder();
    let codec = p.codec();
    codec.save_reverse_map(&builder.build())?;

    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Static);
    assert!(matches!(result.outcome, LoadOutcome::Rebuilt { .. }));
    Ok(())
}

#[test]
fn runtime_mode_bootstraps_then_trusts_reverse_map() -> TestResult {
    let p = project();
    let builder = p.builder();
    let codec = p.codec();
    let loader = IncrementalLoader::new(&builder, &codec);

    let first = loader.load(GraphMode::Runtime);
    assert!(matches!(first.outcome, LoadOutcome::Rebuilt { .. }));
    loader.persist(GraphMode::Runtime, &first)?;
    assert!(matches!(codec.load(), Ok(Snapshot::ReverseMap(_))));

    // Edits are not noticed: the reverse map is trusted as-is.
    p.file("src/b.ts", "");
    let parses = builder.parse_count();
    let second = loader.load(GraphMode::Runtime);
    assert_eq!(second.outcome, LoadOutcome::CacheHit);
    assert_eq!(builder.parse_count(), parses);
    assert_eq!(second.graph.reverse(), first.graph.reverse());
    Ok(())
}

#[test]
fn runtime_mode_migrates_mtime_cache_with_edges() -> TestResult {
    let p = project();
    let builder = p.builder();
    let codec = p.codec();
    let edges = single(p.path("src/c.ts"), p.path("src/a.test.ts"));
    codec.save_mtime(&builder.build(), Some(&edges))?;
    let parses = builder.parse_count();

    let loader = IncrementalLoader::new(&builder, &codec);
    let result = loader.load(GraphMode::Runtime);
    assert_eq!(result.outcome, LoadOutcome::Migrated);
    assert_eq!(builder.parse_count(), parses);
    assert_eq!(result.graph.reverse(), &edges);

    loader.persist(GraphMode::Runtime, &result)?;
    let Ok(Snapshot::ReverseMap(snapshot)) = codec.load() else {
        panic!("expected reverse-map snapshot");
    };
    assert_eq!(snapshot.reverse_map, edges);
    Ok(())
}

#[test]
fn runtime_mode_rebuilds_from_mtime_cache_without_edges() -> TestResult {
    let p = project();
    warm(&p);
    let builder = p.builder();
    let codec = p.codec();
    let result = IncrementalLoader::new(&builder, &codec).load(GraphMode::Runtime);
    assert!(matches!(result.outcome, LoadOutcome::Rebuilt { .. }));
    assert_eq!(builder.parse_count(), 4);
    Ok(())
}

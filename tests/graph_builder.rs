use std::collections::BTreeSet;
use std::error::Error;
use std::path::PathBuf;

use affected::graph::cycles::import_cycles;
use affected::graph::{transpose, DependencyGraph, ImportMap};
use affected_test_utils::{init_tracing, ConfigFileBuilder, MockProject};

type TestResult = Result<(), Box<dyn Error>>;

fn set(paths: &[PathBuf]) -> BTreeSet<PathBuf> {
    paths.iter().cloned().collect()
}

#[test]
fn builds_forward_graph_and_exact_transpose() -> TestResult {
    init_tracing();
    let p = MockProject::new();
    let a = p.file("src/a.ts", "import { b } from './b';\nimport './c';");
    let b = p.file("src/b.ts", "export const b = require('./c');");
    let c = p.file("src/c.ts", "export const c = 1;");
    let t = p.file("src/a.test.ts", "import { a } from './a';");

    let graph = p.builder().build();

    assert_eq!(graph.file_count(), 4);
    assert_eq!(graph.imports_of(&a), Some(&set(&[b.clone(), c.clone()])));
    assert_eq!(graph.imports_of(&b), Some(&set(&[c.clone()])));
    assert_eq!(graph.imports_of(&c), Some(&BTreeSet::new()));
    assert_eq!(graph.imports_of(&t), Some(&set(&[a.clone()])));

    assert_eq!(graph.reverse(), &transpose(graph.forward()));
    assert_eq!(graph.dependents_of(&c), Some(&set(&[a.clone(), b.clone()])));
    assert_eq!(graph.dependents_of(&t), None);
    Ok(())
}

#[test]
fn drops_assets_externals_and_outside_root_imports() -> TestResult {
    let p = MockProject::new();
    p.fs.add_file("/elsewhere/outside.ts", "export {}");
    let a = p.file(
        "src/a.ts",
        r#"
import React from 'react';
import logo from './logo.svg';
import styles from './a.css';
import x from '../../elsewhere/outside';
import { gone } from './does-not-exist';
import { b } from './b';
"#,
    );
    p.file("src/logo.svg", "<svg/>");
    p.file("src/a.css", ".a {}");
    let b = p.file("src/b.ts", "");

    let graph = p.builder().build();

    assert_eq!(graph.imports_of(&a), Some(&set(&[b])));
    assert!(!graph.knows(&p.path("src/logo.svg")));
    assert!(!graph.knows(&PathBuf::from("/elsewhere/outside.ts")));
    Ok(())
}

#[test]
fn ignored_directories_and_globs_are_never_walked_or_linked() -> TestResult {
    let p = MockProject::new();
    let a = p.file("src/a.ts", "import './__fixtures__/data';\nimport './gen/out';");
    p.file("src/__fixtures__/data.ts", "export {}");
    p.file("node_modules/pkg/index.js", "module.exports = 1");
    p.file("dist/bundle.js", "");
    p.file("src/gen/out.ts", "");
    p.file("types/global.d.ts", "declare const x: number;");

    let config = ConfigFileBuilder::new().with_ignore("src/gen/**").build();
    let graph = p.builder_with(&config).build();

    let files: Vec<&PathBuf> = graph.forward().keys().collect();
    assert_eq!(files, vec![&a]);
    assert_eq!(graph.imports_of(&a), Some(&BTreeSet::new()));
    Ok(())
}

#[test]
fn unreadable_file_gets_an_empty_entry_and_does_not_abort() -> TestResult {
    init_tracing();
    let p = MockProject::new();
    let bad = p.path("src/bad.ts");
    p.fs.add_file(&bad, vec![0xff, 0xfe, 0x00]);
    let good = p.file("src/good.ts", "import './bad';");

    let graph = p.builder().build();

    assert_eq!(graph.imports_of(&bad), Some(&BTreeSet::new()));
    assert_eq!(graph.imports_of(&good), Some(&set(&[bad])));
    Ok(())
}

#[test]
fn self_imports_are_dropped() -> TestResult {
    let p = MockProject::new();
    let a = p.file("src/a.ts", "import './a';");
    let graph = p.builder().build();
    assert_eq!(graph.imports_of(&a), Some(&BTreeSet::new()));
    Ok(())
}

#[test]
fn builder_counts_parses() -> TestResult {
    let p = MockProject::new();
    p.file("a.ts", "");
    p.file("b.ts", "");
    let builder = p.builder();
    builder.build();
    assert_eq!(builder.parse_count(), 2);
    Ok(())
}

#[test]
fn refresh_files_updates_and_removes_entries() -> TestResult {
    let p = MockProject::new();
    let a = p.file("a.ts", "import './b';");
    let b = p.file("b.ts", "");
    let c = p.file("c.ts", "");
    let builder = p.builder();
    let mut graph = builder.build();

    p.file("a.ts", "import './c';");
    p.remove("b.ts");
    builder.refresh_files(&mut graph, [a.as_path(), b.as_path()]);

    assert_eq!(graph.imports_of(&a), Some(&set(&[c.clone()])));
    assert!(graph.imports_of(&b).is_none());
    assert_eq!(graph.dependents_of(&c), Some(&set(&[a])));
    assert_eq!(graph.reverse(), &transpose(graph.forward()));
    Ok(())
}

#[test]
fn removing_a_file_keeps_edges_into_it() {
    let a = PathBuf::from("/p/a.ts");
    let b = PathBuf::from("/p/b.ts");
    let mut forward = ImportMap::new();
    forward.insert(a.clone(), set(&[b.clone()]));
    forward.insert(b.clone(), BTreeSet::new());
    let mut graph = DependencyGraph::from_forward(forward, Default::default());

    graph.remove_file(&b);

    assert!(graph.imports_of(&b).is_none());
    assert_eq!(graph.dependents_of(&b), Some(&set(&[a])));
}

#[test]
fn runtime_edges_survive_static_edits() {
    let a = PathBuf::from("/p/a.ts");
    let b = PathBuf::from("/p/b.ts");
    let t = PathBuf::from("/p/b.test.ts");
    let mut forward = ImportMap::new();
    forward.insert(t.clone(), set(&[a.clone()]));
    let mut graph = DependencyGraph::from_forward(forward, Default::default());

    let mut runtime = ImportMap::new();
    runtime.insert(b.clone(), set(&[t.clone()]));
    runtime.insert(a.clone(), set(&[t.clone()]));
    graph.merge_runtime_edges(&runtime);

    // Static import of `a` goes away; the runtime-observed edge stays.
    graph.set_imports(t.clone(), BTreeSet::new(), 2.0);

    assert_eq!(graph.dependents_of(&a), Some(&set(&[t.clone()])));
    assert_eq!(graph.dependents_of(&b), Some(&set(&[t])));
}

#[test]
fn cycles_are_reported_as_components() {
    let a = PathBuf::from("/p/a.ts");
    let b = PathBuf::from("/p/b.ts");
    let c = PathBuf::from("/p/c.ts");
    let d = PathBuf::from("/p/d.ts");
    let mut forward = ImportMap::new();
    forward.insert(a.clone(), set(&[b.clone()]));
    forward.insert(b.clone(), set(&[a.clone()]));
    forward.insert(c.clone(), set(&[c.clone(), a.clone()]));
    forward.insert(d.clone(), set(&[a.clone()]));

    let cycles = import_cycles(&forward);

    assert_eq!(cycles, vec![vec![a, b], vec![c]]);
}

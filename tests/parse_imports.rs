use std::path::Path;
use std::sync::Arc;

use affected::fs::mock::MockFileSystem;
use affected::fs::FileSystem;
use affected::parse::{EsImportParser, ImportParser, RelativeResolver, Resolver};

fn parser() -> EsImportParser {
    EsImportParser::new().expect("patterns compile")
}

#[test]
fn extracts_static_side_effect_and_reexport_forms() {
    let src = r#"
import React from 'react';
import { a, b } from "./ab";
import * as ns from './ns';
import './setup';
export { thing } from './thing';
export * from "./everything";
const c = require('./c');
"#;
    let specs = parser().extract(src);
    assert_eq!(
        specs,
        vec!["react", "./ab", "./ns", "./setup", "./thing", "./everything", "./c"]
    );
}

#[test]
fn multi_line_import_clause_is_recognized() {
    let src = "import {\n  one,\n  two,\n} from './multi';\n";
    assert_eq!(parser().extract(src), vec!["./multi"]);
}

#[test]
fn type_only_imports_are_skipped() {
    let src = r#"
import type { Props } from './types';
import type Foo from './foo-type';
export type { Bar } from './bar-type';
import { type A, type B } from './only-types';
import { type C, value } from './mixed';
import typeorm from 'typeorm';
"#;
    assert_eq!(parser().extract(src), vec!["./mixed", "typeorm"]);
}

#[test]
fn dynamic_imports_need_literal_arguments() {
    let src = r#"
const a = await import('./lazy');
const b = await import(`./template-static`);
const c = await import(`./locales/${lang}`);
const d = await import(name);
const e = require(`./req-static`);
"#;
    assert_eq!(
        parser().extract(src),
        vec!["./lazy", "./template-static", "./req-static"]
    );
}

#[test]
fn commented_out_imports_are_ignored_and_duplicates_collapse() {
    let src = r#"
// import './line-commented';
/* import './block-commented'; */
/*
import './multi-line-commented';
*/
import './kept';
import { x } from './kept';
"#;
    assert_eq!(parser().extract(src), vec!["./kept"]);
}

#[test]
fn closures_work_as_parser_and_resolver() {
    let parse = |_: &Path, text: &str| -> Vec<String> {
        text.lines().map(|l| l.trim().to_string()).collect()
    };
    let resolve = |dir: &Path, spec: &str| -> Option<std::path::PathBuf> { Some(dir.join(spec)) };

    assert_eq!(
        parse.extract_imports(Path::new("/p/a.ts"), "x\ny"),
        vec!["x".to_string(), "y".to_string()]
    );
    assert_eq!(
        resolve.resolve(Path::new("/p"), "q.ts"),
        Some(Path::new("/p/q.ts").to_path_buf())
    );
}

fn resolver_fixture() -> (MockFileSystem, RelativeResolver) {
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/util.ts", "");
    fs.add_file("/p/src/component.tsx", "");
    fs.add_file("/p/src/lib/index.ts", "");
    fs.add_file("/p/src/plain.js", "");
    fs.add_file("/p/src/logo.svg", "");
    fs.add_file("/p/shared/config.mts", "");
    let exts = ["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let arc: Arc<dyn FileSystem> = Arc::new(fs.clone());
    (fs, RelativeResolver::new(arc, exts))
}

#[test]
fn resolver_probes_extensions_index_and_emitted_names() {
    let (_fs, resolver) = resolver_fixture();
    let dir = Path::new("/p/src");

    assert_eq!(resolver.resolve(dir, "./util"), Some("/p/src/util.ts".into()));
    assert_eq!(resolver.resolve(dir, "./util.js"), Some("/p/src/util.ts".into()));
    assert_eq!(resolver.resolve(dir, "./component.js"), Some("/p/src/component.tsx".into()));
    assert_eq!(resolver.resolve(dir, "./lib"), Some("/p/src/lib/index.ts".into()));
    assert_eq!(resolver.resolve(dir, "./plain.js"), Some("/p/src/plain.js".into()));
    assert_eq!(resolver.resolve(dir, "../shared/config.mjs"), Some("/p/shared/config.mts".into()));
    assert_eq!(resolver.resolve(dir, "./logo.svg"), Some("/p/src/logo.svg".into()));
}

#[test]
fn resolver_leaves_bare_and_missing_specifiers_unresolved() {
    let (_fs, resolver) = resolver_fixture();
    let dir = Path::new("/p/src");

    assert_eq!(resolver.resolve(dir, "react"), None);
    assert_eq!(resolver.resolve(dir, "node:fs"), None);
    assert_eq!(resolver.resolve(dir, "virtual:config"), None);
    assert_eq!(resolver.resolve(dir, "./missing"), None);
}

#[test]
fn resolver_strips_query_and_hash() {
    let (_fs, resolver) = resolver_fixture();
    assert_eq!(
        resolver.resolve(Path::new("/p/src"), "./util?worker"),
        Some("/p/src/util.ts".into())
    );
    assert_eq!(
        resolver.resolve(Path::new("/p/src"), "./util#frag"),
        Some("/p/src/util.ts".into())
    );
}

#[test]
fn comment_markers_inside_strings_do_not_hide_imports() {
    let src = r#"
const alias = '@/*';
import { helper } from './helper';
const lazy = () => import('./lazy');
/** docs */
export function f() {}
"#;
    assert_eq!(parser().extract(src), vec!["./helper", "./lazy"]);
}

#[test]
fn strings_and_templates_with_slashes_keep_following_imports() {
    let src = r#"
const url = "https://example.com/*";
const glob = `lib/**/*.ts`;
const escaped = 'it\'s /* not a comment';
import './after-strings';
const x = require('./req'); // trailing comment with import('./nope')
/* block
   import './hidden';
*/ import './same-line-after-block';
"#;
    assert_eq!(
        parser().extract(src),
        vec!["./after-strings", "./same-line-after-block", "./req"]
    );
}

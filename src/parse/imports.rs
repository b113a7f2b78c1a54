// src/parse/imports.rs

//! Regex-based import extraction for JavaScript / TypeScript sources.
//!
//! A scanner, not a parser: it recognizes the handful of
//! syntactic forms that create a runtime dependency and ignores everything
//! else. Anything it misses is still caught by runtime-observed edges.

use std::collections::HashSet;
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use crate::parse::ImportParser;

const IMPORT_FROM: &str = r#"(?m)^\s*import\s+([^'"`;]*?)\s*from\s*['"]([^'"\n]+)['"]"#;
const IMPORT_SIDE_EFFECT: &str = r#"(?m)^\s*import\s*['"]([^'"\n]+)['"]"#;
const EXPORT_FROM: &str = r#"(?m)^\s*export\s+([^'"`;]*?)\s*from\s*['"]([^'"\n]+)['"]"#;
const DYNAMIC_IMPORT: &str = r#"\bimport\s*\(\s*(?:'([^'\n]*)'|"([^"\n]*)"|`([^`]*)`)\s*[,)]"#;
const REQUIRE_CALL: &str = r#"\brequire\s*\(\s*(?:'([^'\n]*)'|"([^"\n]*)"|`([^`]*)`)\s*\)"#;

/// Default [`ImportParser`] for ES modules and CommonJS.
///
/// Recognized forms:
/// - `import x from "m"`, `import { a } from "m"`, `import * as ns from "m"`
/// - `import "m"` (side effect only)
/// - `export { a } from "m"`, `export * from "m"`
/// - `require("m")`
/// - `import("m")` and `` import(`m`) `` when the template has no `${…}`
///
/// Skipped: `import type …`, `export type …`, brace lists that contain only
/// `type X` members, and dynamic imports with computed arguments.
#[derive(Debug, Clone)]
pub struct EsImportParser {
    import_from: Regex,
    import_side_effect: Regex,
    export_from: Regex,
    dynamic_import: Regex,
    require_call: Regex,
}

impl EsImportParser {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).with_context(|| format!("compiling import pattern {pattern}"))
        };
        Ok(Self {
            import_from: compile(IMPORT_FROM)?,
            import_side_effect: compile(IMPORT_SIDE_EFFECT)?,
            export_from: compile(EXPORT_FROM)?,
            dynamic_import: compile(DYNAMIC_IMPORT)?,
            require_call: compile(REQUIRE_CALL)?,
        })
    }

    /// Extract specifiers in order of first appearance per form, deduplicated.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let source = strip_comments(text);

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut push = |spec: &str| {
            if !spec.is_empty() && seen.insert(spec.to_string()) {
                out.push(spec.to_string());
            }
        };

        for caps in self.import_from.captures_iter(&source) {
            if !is_type_only_clause(&caps[1]) {
                push(&caps[2]);
            }
        }
        for caps in self.import_side_effect.captures_iter(&source) {
            push(&caps[1]);
        }
        for caps in self.export_from.captures_iter(&source) {
            if !is_type_only_clause(&caps[1]) {
                push(&caps[2]);
            }
        }
        for caps in self.dynamic_import.captures_iter(&source) {
            if let Some(spec) = literal_argument(&caps) {
                push(spec);
            }
        }
        for caps in self.require_call.captures_iter(&source) {
            if let Some(spec) = literal_argument(&caps) {
                push(spec);
            }
        }

        out
    }
}

impl ImportParser for EsImportParser {
    fn extract_imports(&self, _path: &Path, text: &str) -> Vec<String> {
        self.extract(text)
    }
}

/// Blank out `//` and `/* */` comments outside string and template
/// literals. Newlines inside comments are kept so the line-anchored patterns
/// see the original line structure.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                copy_literal(c, &mut chars, &mut out);
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&next| next != '\n').is_some() {}
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Copy a literal opened by `quote` through its closing quote. Plain strings
/// also end at a newline, so an unterminated one cannot swallow the file.
fn copy_literal(quote: char, chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '\n' if quote != '`' => return,
            c if c == quote => return,
            _ => {}
        }
    }
}

/// The argument of `import(…)` / `require(…)` if it is a plain string or a
/// template literal without interpolation.
fn literal_argument<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
        return Some(m.as_str());
    }
    let template = caps.get(3)?.as_str();
    if template.contains("${") {
        None
    } else {
        Some(template)
    }
}

/// True for `type X`, `type { A }`, `type * as ns` and `{ type A, type B }`.
fn is_type_only_clause(clause: &str) -> bool {
    let clause = clause.trim();

    if let Some(rest) = clause.strip_prefix("type") {
        if rest.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '*') {
            return true;
        }
    }

    if let Some(inner) = clause.strip_prefix('{').and_then(|c| c.strip_suffix('}')) {
        let members: Vec<&str> = inner
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .collect();
        return !members.is_empty()
            && members
                .iter()
                .all(|m| m.strip_prefix("type").is_some_and(|r| r.starts_with(char::is_whitespace)));
    }

    false
}

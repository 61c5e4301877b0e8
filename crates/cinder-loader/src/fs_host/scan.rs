// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static module syntax scanning
//!
//! Regex-based, not a parser: it finds the specifiers a module pulls in,
//! literal exports and top-level `await`. Text inside comments and strings
//! is not excluded.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s+(?:[\w$*\s{},]+?\s+from\s+)?['"]([^'"]+)['"]"#)
        .expect("import pattern is valid")
});

static EXPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bexport\s+(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s+from\s+['"]([^'"]+)['"]"#)
        .expect("export-from pattern is valid")
});

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("require pattern is valid")
});

static EXPORT_BINDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bexport\s+(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*([^;\n]+)"#)
        .expect("export binding pattern is valid")
});

static EXPORT_DEFAULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bexport\s+default\s+([^;\n]+)"#).expect("export default pattern is valid")
});

static MODULE_EXPORTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bmodule\.exports\s*=\s*([^;\n]+)"#).expect("module.exports pattern is valid")
});

static AWAIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bawait\b"#).expect("await pattern is valid"));

static BARE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([{,]\s*)([A-Za-z_$][\w$]*)\s*:"#).expect("bare key pattern is valid")
});

/// What a scan found in one module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleSyntax {
    /// Requested specifiers in source order, first occurrence only
    pub requested: Vec<String>,
    /// Literal exports by name
    pub exports: Map<String, Value>,
    /// Value assigned to `module.exports`, if any
    pub module_exports: Option<Value>,
    /// Whether `await` appears outside any block
    pub top_level_await: bool,
}

impl ModuleSyntax {
    /// Namespace object for the scanned module
    pub fn namespace(&self) -> Value {
        match &self.module_exports {
            Some(value) => value.clone(),
            None => Value::Object(self.exports.clone()),
        }
    }
}

/// Scan module source
pub fn scan_module(source: &str) -> ModuleSyntax {
    let mut found: Vec<(usize, String)> = Vec::new();
    for re in [&*IMPORT_RE, &*EXPORT_FROM_RE, &*REQUIRE_RE] {
        for cap in re.captures_iter(source) {
            if let (Some(whole), Some(spec)) = (cap.get(0), cap.get(1)) {
                found.push((whole.start(), spec.as_str().to_string()));
            }
        }
    }
    found.sort_by_key(|(pos, _)| *pos);

    let mut requested: Vec<String> = Vec::with_capacity(found.len());
    for (_, spec) in found {
        if !requested.contains(&spec) {
            requested.push(spec);
        }
    }

    let mut exports = Map::new();
    for cap in EXPORT_BINDING_RE.captures_iter(source) {
        let name = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        let literal = cap.get(2).map(|m| m.as_str()).unwrap_or_default();
        exports.insert(name.to_string(), parse_literal(literal));
    }
    if let Some(literal) = EXPORT_DEFAULT_RE
        .captures(source)
        .and_then(|cap| cap.get(1))
    {
        exports.insert("default".to_string(), parse_literal(literal.as_str()));
    }

    let module_exports = MODULE_EXPORTS_RE
        .captures(source)
        .and_then(|cap| cap.get(1))
        .map(|m| parse_literal(m.as_str()));

    let mut depth = 0;
    let mut scanned = 0;
    let top_level_await = AWAIT_RE.find_iter(source).any(|m| {
        depth += brace_depth(&source[scanned..m.start()]);
        scanned = m.start();
        depth == 0
    });

    ModuleSyntax {
        requested,
        exports,
        module_exports,
        top_level_await,
    }
}

/// Parse a JSON-ish literal; anything else becomes `null`
fn parse_literal(text: &str) -> Value {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str(text) {
        return value;
    }
    let relaxed = BARE_KEY_RE.replace_all(text, r#"$1"$2":"#).replace('\'', "\"");
    serde_json::from_str(&relaxed).unwrap_or(Value::Null)
}

/// Net change in brace depth across `text`
fn brace_depth(text: &str) -> i64 {
    text.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requested_in_source_order() {
        let source = r#"
            import foo from './z.js';
            const a = require('./a.js');
            import { bar, baz as qux } from "./m.js";
            export * from './re.js';
            import './side-effect.js';
            import * as all from './z.js';
        "#;
        let syntax = scan_module(source);
        assert_eq!(
            syntax.requested,
            vec!["./z.js", "./a.js", "./m.js", "./re.js", "./side-effect.js"]
        );
    }

    #[test]
    fn test_dynamic_import_is_not_static() {
        let syntax = scan_module("const m = import('./lazy.js'); console.log(import.meta.url);");
        assert!(syntax.requested.is_empty());
    }

    #[test]
    fn test_literal_exports() {
        let source = r#"
            export const v = 1;
            export let name = "cinder";
            export var obj = { a: 1, 'b': 'two' };
            export const f = () => 3;
            export default true;
        "#;
        let syntax = scan_module(source);
        assert_eq!(
            syntax.namespace(),
            json!({
                "v": 1,
                "name": "cinder",
                "obj": { "a": 1, "b": "two" },
                "f": null,
                "default": true
            })
        );
    }

    #[test]
    fn test_module_exports_wins() {
        let syntax = scan_module("require('./b.js');\nmodule.exports = {v: 1};\n");
        assert_eq!(syntax.requested, vec!["./b.js"]);
        assert_eq!(syntax.namespace(), json!({ "v": 1 }));
    }

    #[test]
    fn test_top_level_await() {
        assert!(scan_module("const x = await fetch('/');").top_level_await);
        assert!(!scan_module("async function f() { await g(); }").top_level_await);
        assert!(
            scan_module("async function f() { await g(); }\nawait f();").top_level_await
        );
        assert!(
            !scan_module("if (x) { await a(); } else { await b(); }").top_level_await
        );
    }
}

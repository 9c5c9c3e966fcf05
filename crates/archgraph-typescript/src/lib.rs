use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use archgraph_core::extractor::ImportExtractor;

/// Static import forms: `import … from 'x'`, `import 'x'`, `export … from 'x'`,
/// `import x = require('x')`, and calls whose first argument is a string literal (filtered to `require`
/// and dynamic `import` in code).
const IMPORT_QUERY_SRC: &str = r#"
(import_statement
  source: (string) @path)

(export_statement
  source: (string) @path)

(import_require_clause
  source: (string) @path)

(call_expression
  function: _ @callee
  arguments: (arguments . (string) @path))
"#;

/// Query compiled for one grammar, with its capture indices.
struct ImportQuery {
    query: Query,
    path_idx: u32,
    callee_idx: Option<u32>,
}

impl ImportQuery {
    fn compile(language: &Language) -> Result<Self> {
        let query =
            Query::new(language, IMPORT_QUERY_SRC).context("failed to compile import query")?;
        let index_of = |name: &str| {
            query
                .capture_names()
                .iter()
                .position(|n| *n == name)
                .map(|i| i as u32)
        };
        let path_idx = index_of("path").context("import query has no @path capture")?;
        let callee_idx = index_of("callee");
        Ok(Self {
            query,
            path_idx,
            callee_idx,
        })
    }
}

/// Shallow syntax-level import extractor for TypeScript and JavaScript.
///
/// `.ts` files use the TypeScript grammar; `.tsx`, `.js` and `.jsx` use the
/// TSX grammar so JSX parses. Files with syntax errors still yield whatever
/// imports the parser recovered.
pub struct TypeScriptExtractor {
    ts_language: Language,
    tsx_language: Language,
    ts_query: ImportQuery,
    tsx_query: ImportQuery,
}

impl TypeScriptExtractor {
    pub fn new() -> Result<Self> {
        let ts_language: Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
        let tsx_language: Language = tree_sitter_typescript::LANGUAGE_TSX.into();

        let ts_query = ImportQuery::compile(&ts_language)?;
        let tsx_query = ImportQuery::compile(&tsx_language)?;

        Ok(Self {
            ts_language,
            tsx_language,
            ts_query,
            tsx_query,
        })
    }

    fn grammar_for(&self, path: &Path) -> (&Language, &ImportQuery) {
        match path.extension().and_then(|e| e.to_str()) {
            Some("ts" | "mts" | "cts") => (&self.ts_language, &self.ts_query),
            _ => (&self.tsx_language, &self.tsx_query),
        }
    }
}

impl ImportExtractor for TypeScriptExtractor {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn file_extensions(&self) -> &[&str] {
        &["ts", "tsx", "js", "jsx", "mts", "cts", "mjs", "cjs"]
    }

    fn extract_specifiers(&self, path: &Path, content: &str) -> Result<Vec<String>> {
        let (language, import_query) = self.grammar_for(path);
        let mut parser = Parser::new();
        parser
            .set_language(language)
            .context("failed to set TypeScript language")?;
        let tree = parser
            .parse(content, None)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let source = content.as_bytes();
        let mut found: Vec<(usize, String)> = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&import_query.query, tree.root_node(), source);

        while let Some(m) = matches.next() {
            let mut spec = None;
            let mut callee_ok = true;
            for capture in m.captures {
                if capture.index == import_query.path_idx {
                    spec = Some(capture.node);
                } else if Some(capture.index) == import_query.callee_idx {
                    callee_ok = matches!(node_text(capture.node, source), "require" | "import");
                }
            }
            if !callee_ok {
                continue;
            }
            if let Some(node) = spec {
                let text = unquote(node_text(node, source));
                if !text.is_empty() {
                    found.push((node.start_byte(), text.to_string()));
                }
            }
        }

        found.sort_by_key(|(offset, _)| *offset);
        found.dedup();
        Ok(found.into_iter().map(|(_, spec)| spec).collect())
    }
}

fn node_text<'a>(node: Node<'_>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(file: &str, content: &str) -> Vec<String> {
        let extractor = TypeScriptExtractor::new().unwrap();
        extractor
            .extract_specifiers(Path::new(file), content)
            .unwrap()
    }

    #[test]
    fn test_es_module_imports() {
        let specs = extract(
            "src/app.ts",
            r#"
import { UserService } from './services/user';
import type { User } from "../models/user";
import * as path from 'path';
import './polyfills';

export const x = 1;
"#,
        );
        assert_eq!(
            specs,
            vec!["./services/user", "../models/user", "path", "./polyfills"]
        );
    }

    #[test]
    fn test_reexports() {
        let specs = extract(
            "src/index.ts",
            "export { a } from './a';\nexport * from './b';\nexport const c = 3;\n",
        );
        assert_eq!(specs, vec!["./a", "./b"]);
    }

    #[test]
    fn test_require_and_dynamic_import() {
        let specs = extract(
            "src/legacy.js",
            r#"
const fs = require('fs');
const util = require("./util");
const other = someCall('./not-an-import');
async function load() {
  const mod = await import('./lazy');
  return mod;
}
"#,
        );
        assert_eq!(specs, vec!["fs", "./util", "./lazy"]);
    }

    #[test]
    fn test_import_equals_require() {
        let specs = extract(
            "src/a.ts",
            "import fs = require('./b');\nimport path = require(\"path\");\nexport = fs;\n",
        );
        assert_eq!(specs, vec!["./b", "path"]);
    }

    #[test]
    fn test_tsx_component() {
        let specs = extract(
            "src/ui/Page.tsx",
            r#"
import React from 'react';
import { Button } from './Button';

export function Page() {
  return <Button label="hi" />;
}
"#,
        );
        assert_eq!(specs, vec!["react", "./Button"]);
    }

    #[test]
    fn test_comments_are_not_imports() {
        let specs = extract(
            "src/a.ts",
            "// import x from './commented';\n/* require('./block') */\nimport y from './real';\n",
        );
        assert_eq!(specs, vec!["./real"]);
    }

    #[test]
    fn test_syntax_errors_are_tolerated() {
        let specs = extract("src/broken.ts", "import { a } from './a';\nconst = = ;\n");
        assert!(specs.contains(&"./a".to_string()));
    }

    #[test]
    fn test_extensions() {
        let extractor = TypeScriptExtractor::new().unwrap();
        for ext in ["ts", "tsx", "js", "jsx"] {
            assert!(extractor.file_extensions().contains(&ext));
        }
        assert_eq!(extractor.name(), "typescript");
    }
}

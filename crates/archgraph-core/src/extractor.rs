use std::path::Path;
use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;

/// Extracts statically declared module specifiers from one source file.
pub trait ImportExtractor: Send + Sync {
    /// Short name used in logs (e.g. "typescript", "text").
    fn name(&self) -> &'static str;

    /// File extensions this extractor understands (without the dot).
    fn file_extensions(&self) -> &[&str];

    /// Return raw specifiers in source order, e.g. `"./b"`, `"react"`.
    fn extract_specifiers(&self, path: &Path, content: &str) -> Result<Vec<String>>;
}

/// Best-effort, grammar-free scanner for ES module and CommonJS imports.
///
/// Recognizes `import … from 'x'`, `import 'x'`, `export … from 'x'`,
/// `require('x')` and `import('x')` after removing block comments and
/// whole-line `//` comments.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextImportScanner;

struct ScannerPatterns {
    block_comment: Regex,
    line_comment: Regex,
    specifier: Regex,
}

fn patterns() -> &'static ScannerPatterns {
    static PATTERNS: OnceLock<ScannerPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ScannerPatterns {
        block_comment: Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment regex"),
        line_comment: Regex::new(r"(?m)^\s*//.*$").expect("valid line comment regex"),
        specifier: Regex::new(
            r#"(?:\bfrom\s*|\bimport\s*|\b(?:require|import)\s*\(\s*)["']([^"'\n]+)["']"#,
        )
        .expect("valid specifier regex"),
    })
}

impl TextImportScanner {
    pub fn new() -> Self {
        Self
    }
}

impl ImportExtractor for TextImportScanner {
    fn name(&self) -> &'static str {
        "text"
    }

    fn file_extensions(&self) -> &[&str] {
        &["ts", "tsx", "js", "jsx", "mjs", "cjs"]
    }

    fn extract_specifiers(&self, _path: &Path, content: &str) -> Result<Vec<String>> {
        let p = patterns();
        let without_blocks = p.block_comment.replace_all(content, "");
        let stripped = p.line_comment.replace_all(&without_blocks, "");
        Ok(p
            .specifier
            .captures_iter(&stripped)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect())
    }
}

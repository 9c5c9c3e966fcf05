use std::path::{Path, PathBuf};

use globset::{GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{compile_glob, Config};
use crate::error::ConfigError;
use crate::types::normalize_separators;

/// Enumerates candidate source files under a workspace root.
pub struct FileWalker {
    root: PathBuf,
    extensions: Vec<String>,
    excludes: GlobSet,
    /// Directory forms of `…/**` excludes, used to skip whole subtrees.
    pruned_dirs: GlobSet,
}

impl FileWalker {
    pub fn new(root: &Path, config: &Config) -> Result<Self, ConfigError> {
        let mut excludes = GlobSetBuilder::new();
        let mut pruned = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            excludes.add(compile_glob(pattern, "exclude")?);
            if let Some(dir) = pattern.strip_suffix("/**") {
                if !dir.is_empty() {
                    pruned.add(compile_glob(dir, "exclude")?);
                }
            }
        }
        let invalid = |source| ConfigError::InvalidGlob {
            context: "exclude",
            pattern: config.exclude_patterns.join(", "),
            source,
        };
        Ok(Self {
            root: root.to_path_buf(),
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
            excludes: excludes.build().map_err(invalid)?,
            pruned_dirs: pruned.build().map_err(invalid)?,
        })
    }

    /// Whether a workspace-relative path is excluded by configuration.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.excludes.is_match(rel_path)
    }

    /// Whether a workspace-relative path has a configured source extension.
    pub fn has_source_extension(&self, rel_path: &str) -> bool {
        Path::new(rel_path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Whether a workspace-relative path would be produced by [`walk`](Self::walk).
    pub fn accepts(&self, rel_path: &str) -> bool {
        self.has_source_extension(rel_path) && !self.is_excluded(rel_path)
    }

    /// Walk the root and return sorted, normalized, workspace-relative paths.
    /// Unreadable entries are skipped.
    pub fn walk(&self) -> Vec<String> {
        let root = &self.root;
        let mut files: Vec<String> = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let rel = relative_id(root, entry.path());
                !self.pruned_dirs.is_match(&rel)
            })
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| relative_id(root, e.path()))
            .filter(|rel| self.accepts(rel))
            .collect();
        files.sort();
        files
    }
}

fn relative_id(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    normalize_separators(&rel.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    fn walker(root: &Path, excludes: &[&str]) -> FileWalker {
        let config = Config {
            exclude_patterns: excludes.iter().map(|s| s.to_string()).collect(),
            ..Config::default()
        };
        FileWalker::new(root, &config).unwrap()
    }

    #[test]
    fn test_walk_filters_extensions_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/b.ts");
        touch(dir.path(), "src/a.tsx");
        touch(dir.path(), "src/c.js");
        touch(dir.path(), "src/d.jsx");
        touch(dir.path(), "README.md");
        touch(dir.path(), "src/styles.css");

        let files = walker(dir.path(), &[]).walk();
        assert_eq!(files, vec!["src/a.tsx", "src/b.ts", "src/c.js", "src/d.jsx"]);
    }

    #[test]
    fn test_exclude_test_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/a.ts");
        touch(dir.path(), "src/a.test.ts");
        touch(dir.path(), "src/deep/nested/b.test.ts");
        touch(dir.path(), "c.test.ts");

        let files = walker(dir.path(), &["**/*.test.ts"]).walk();
        assert_eq!(files, vec!["src/a.ts"]);
        assert!(files.iter().all(|f| !f.ends_with(".test.ts")));
    }

    #[test]
    fn test_anchored_pattern_is_full_path_match() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "dist/bundle.js");
        touch(dir.path(), "src/dist-utils.ts");
        touch(dir.path(), "src/dist/inner.ts");

        let files = walker(dir.path(), &["dist/**"]).walk();
        assert_eq!(files, vec!["src/dist-utils.ts", "src/dist/inner.ts"]);
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let w = walker(Path::new("."), &["src/*.ts"]);
        assert!(w.is_excluded("src/a.ts"));
        assert!(!w.is_excluded("src/nested/a.ts"));
    }

    #[test]
    fn test_double_star_matches_zero_directories() {
        let w = walker(Path::new("."), &["**/node_modules/**"]);
        assert!(w.is_excluded("node_modules/react/index.js"));
        assert!(w.is_excluded("packages/web/node_modules/react/index.js"));
        assert!(!w.is_excluded("src/node_modules_helper.ts"));
    }

    #[test]
    fn test_default_excludes_prune_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "node_modules/lib/index.js");
        touch(dir.path(), "packages/app/node_modules/x/index.ts");
        touch(dir.path(), "packages/app/src/main.ts");
        touch(dir.path(), "types/global.d.ts");

        let w = FileWalker::new(dir.path(), &Config::default()).unwrap();
        assert_eq!(w.walk(), vec!["packages/app/src/main.ts"]);
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let w = walker(Path::new("/definitely/not/here"), &[]);
        assert!(w.walk().is_empty());
    }

    #[test]
    fn test_invalid_exclude_is_config_error() {
        let config = Config {
            exclude_patterns: vec!["a/[b".to_string()],
            ..Config::default()
        };
        assert!(FileWalker::new(Path::new("."), &config).is_err());
    }
}

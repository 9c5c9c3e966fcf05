use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::metrics::AnalysisResult;

const RESULTS_DIR: &str = "results";
const KEY_LEN: usize = 16;

/// Raw import specifiers of one file, keyed by the hash of the content they
/// were extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFile {
    pub hash: String,
    pub specifiers: Vec<String>,
}

/// What one run leaves behind for the next: the result itself plus the
/// per-file extraction state incremental runs reuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRun {
    pub result: AnalysisResult,
    #[serde(default)]
    pub files: BTreeMap<String, CachedFile>,
}

impl CachedRun {
    /// Cached specifiers for `rel_path` if `content` is what they were
    /// extracted from.
    pub fn specifiers_for(&self, rel_path: &str, content: &str) -> Option<&[String]> {
        let cached = self.files.get(rel_path)?;
        (cached.hash == compute_hash(content)).then_some(cached.specifiers.as_slice())
    }
}

/// Most recent analysis run for one workspace, stored as JSON under
/// `<cache_dir>/results/<key>.json`.
#[derive(Debug, Clone)]
pub struct ResultCache {
    path: PathBuf,
}

impl ResultCache {
    /// Cache for `root`, keyed by the hash of its canonical path.
    pub fn for_workspace(cache_dir: &Path, root: &Path) -> Self {
        let key = workspace_key(root);
        Self {
            path: cache_dir.join(RESULTS_DIR).join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the prior run. A missing or unreadable file means no prior run.
    pub fn load(&self) -> Option<CachedRun> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no cached result");
            return None;
        }
        match self.read() {
            Ok(run) => Some(run),
            Err(e) => {
                warn!(path = %self.path.display(), error = %format!("{e:#}"), "ignoring cached result");
                None
            }
        }
    }

    fn read(&self) -> Result<CachedRun> {
        let content = std::fs::read_to_string(&self.path).context("failed to read cached result")?;
        serde_json::from_str(&content).context("failed to parse cached result")
    }

    /// Persist `run`, replacing any previous entry.
    pub fn store(&self, run: &CachedRun) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let content =
            serde_json::to_string_pretty(run).context("failed to serialize analysis result")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// First 16 hex characters of the SHA-256 of the canonical workspace path.
pub fn workspace_key(root: &Path) -> String {
    let canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(KEY_LEN);
    hex
}

/// Hex SHA-256 of file content.
pub fn compute_hash(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphSnapshot;
    use crate::metrics::Metrics;
    use crate::types::{ModuleId, Scope};

    fn sample_run() -> CachedRun {
        let mut files = BTreeMap::new();
        files.insert(
            "a.ts".to_string(),
            CachedFile {
                hash: compute_hash("import './b';\n"),
                specifiers: vec!["./b".to_string()],
            },
        );
        CachedRun {
            result: sample_result(),
            files,
        }
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            issues: vec![],
            metrics: Metrics {
                total_modules: 1,
                total_dependencies: 0,
                circular_dependencies: 0,
                avg_coupling: 0.0,
                layer_health: 100.0,
                architecture_score: 100.0,
                performance: None,
            },
            graph: GraphSnapshot {
                nodes: vec![ModuleId::new("a.ts")],
                edges: vec![],
                cycles: vec![],
            },
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            scope: Scope::Full,
            incomplete: false,
        }
    }

    #[test]
    fn test_workspace_key_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let a = workspace_key(dir.path());
        let b = workspace_key(&dir.path().join("."));
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::for_workspace(&dir.path().join(".archgraph"), dir.path());
        assert!(cache.load().is_none());

        let run = sample_run();
        cache.store(&run).unwrap();
        assert!(cache.path().starts_with(dir.path().join(".archgraph").join("results")));
        assert_eq!(cache.load(), Some(run));
    }

    #[test]
    fn test_specifiers_require_matching_content() {
        let run = sample_run();
        assert_eq!(
            run.specifiers_for("a.ts", "import './b';\n"),
            Some(&["./b".to_string()][..])
        );
        assert!(run.specifiers_for("a.ts", "import './c';\n").is_none());
        assert!(run.specifiers_for("b.ts", "").is_none());
    }

    #[test]
    fn test_bare_result_entry_is_no_prior_run() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::for_workspace(dir.path(), dir.path());
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        let bare = serde_json::to_string(&sample_result()).unwrap();
        std::fs::write(cache.path(), bare).unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_compute_hash() {
        assert_eq!(compute_hash("a"), compute_hash("a"));
        assert_ne!(compute_hash("a"), compute_hash("b"));
        assert_eq!(compute_hash("").len(), 64);
    }

    #[test]
    fn test_corrupt_file_is_no_prior_result() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::for_workspace(dir.path(), dir.path());
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(cache.path(), "{not json").unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_distinct_workspaces_distinct_entries() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let cache_dir = Path::new("/tmp/cache");
        assert_ne!(
            ResultCache::for_workspace(cache_dir, a.path()).path(),
            ResultCache::for_workspace(cache_dir, b.path()).path()
        );
    }
}

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cache::{self, CachedFile, CachedRun, ResultCache};
use crate::config::Config;
use crate::detectors;
use crate::diagram::{self, DiagramFormat};
use crate::drift::{self, GraphSize};
use crate::error::AnalysisError;
use crate::extractor::ImportExtractor;
use crate::graph::DependencyGraph;
use crate::layer::LayerClassifier;
use crate::metrics::{self, AnalysisResult, PerformanceTelemetry};
use crate::resolve::ModuleResolver;
use crate::scope::{self, ChangeSource, GitChangeSource, ScopeSelection};
use crate::types::{ModuleId, Scope};
use crate::walker::FileWalker;

/// Extraction outcome for one file.
struct FileEdges {
    id: ModuleId,
    targets: Vec<ModuleId>,
    /// Content hash and raw specifiers, kept for the next incremental run.
    /// `None` when the file could not be read or was skipped.
    record: Option<CachedFile>,
    /// Specifiers came from the cached run instead of the extractor.
    reused: bool,
    /// Extraction was skipped because the time budget ran out.
    skipped: bool,
}

impl FileEdges {
    fn skipped(id: ModuleId) -> Self {
        Self {
            id,
            targets: Vec::new(),
            record: None,
            reused: false,
            skipped: true,
        }
    }
}

/// Runs the walk → extract → build → detect → aggregate pipeline for one
/// workspace and keeps the most recent result.
pub struct ArchitectureAnalyzer {
    root: PathBuf,
    config: Config,
    walker: FileWalker,
    classifier: LayerClassifier,
    extractor: Box<dyn ImportExtractor>,
    changes: Box<dyn ChangeSource>,
    cache: ResultCache,
    pool: Option<rayon::ThreadPool>,
    last: Option<AnalysisResult>,
}

impl ArchitectureAnalyzer {
    /// Validate `config` and prepare an analyzer for `root`. Configuration
    /// problems are reported here, before any file is touched.
    pub fn new(
        root: &Path,
        config: Config,
        extractor: Box<dyn ImportExtractor>,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        if !root.is_dir() {
            return Err(AnalysisError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        let walker = FileWalker::new(root, &config)?;
        let classifier = LayerClassifier::new(&config.layers)?;
        let cache = ResultCache::for_workspace(&config.cache_dir_for(root), root);
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_workers)
            .thread_name(|i| format!("archgraph-worker-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, "failed to build worker pool, using the global pool");
                None
            }
        };

        Ok(Self {
            root: root.to_path_buf(),
            config,
            walker,
            classifier,
            extractor,
            changes: Box::new(GitChangeSource),
            cache,
            pool,
            last: None,
        })
    }

    /// Replace the version-control query used for incremental scope.
    pub fn with_change_source(mut self, changes: Box<dyn ChangeSource>) -> Self {
        self.changes = changes;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Most recent result produced by this analyzer.
    pub fn last_result(&self) -> Option<&AnalysisResult> {
        self.last.as_ref()
    }

    /// Analyze the workspace, re-extracting only changed files when
    /// incremental mode is enabled.
    pub fn analyze(&mut self) -> AnalysisResult {
        let result = self.in_pool(|| self.run(self.config.use_incremental));
        self.last = Some(result.clone());
        result
    }

    /// Analyze the workspace, extracting every file.
    pub fn analyze_full(&mut self) -> AnalysisResult {
        let result = self.in_pool(|| self.run(false));
        self.last = Some(result.clone());
        result
    }

    /// Write the most recent graph as DOT, or Mermaid for `.mmd`/`.mermaid`
    /// paths.
    pub fn export_visualization(&self, path: &Path) -> Result<(), AnalysisError> {
        let result = self.last.as_ref().ok_or(AnalysisError::NoAnalysis)?;
        let content = diagram::render(
            &result.graph,
            DiagramFormat::from_path(path),
            self.config.visualization_max_nodes,
        );
        std::fs::write(path, content).map_err(|source| AnalysisError::Export {
            path: path.to_path_buf(),
            source,
        })
    }

    fn in_pool<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn run(&self, allow_incremental: bool) -> AnalysisResult {
        let started = Instant::now();
        let deadline = self
            .config
            .time_budget_ms
            .map(|ms| started + Duration::from_millis(ms));

        let files = self.walker.walk();
        let known: HashSet<String> = files.iter().cloned().collect();
        let previous = self.cache.load();

        let selection = if allow_incremental {
            scope::select_scope(self.changes.as_ref(), &self.root, &known)
        } else {
            ScopeSelection::full()
        };
        // Files outside the change set reuse cached specifiers, but only
        // while their content still hashes to the cached value.
        let reusable = match (selection.scope, previous.as_ref()) {
            (Scope::Incremental, Some(prev)) => Some(prev),
            (Scope::Incremental, None) => {
                debug!("no cached run, extracting every file");
                None
            }
            (Scope::Full, _) => None,
        };

        let timed_out = AtomicBool::new(false);
        let resolver = ModuleResolver::new(&known, &self.config.extensions);

        let extracted: Vec<FileEdges> = files
            .par_iter()
            .map(|file| {
                let id = ModuleId::new(file.as_str());
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    timed_out.store(true, Ordering::Relaxed);
                    return FileEdges::skipped(id);
                }
                let Some(content) = self.read_source(file) else {
                    return FileEdges {
                        id,
                        targets: Vec::new(),
                        record: None,
                        reused: false,
                        skipped: false,
                    };
                };

                let cached = reusable
                    .filter(|_| !selection.needs_extraction(file))
                    .and_then(|prev| prev.specifiers_for(file, &content));
                let (specifiers, reused) = match cached {
                    Some(specs) => (specs.to_vec(), true),
                    None => (self.extract_specifiers(file, &content), false),
                };
                let targets = specifiers
                    .iter()
                    .filter_map(|spec| resolver.resolve(file, spec))
                    .collect();
                FileEdges {
                    id,
                    targets,
                    record: Some(CachedFile {
                        hash: cache::compute_hash(&content),
                        specifiers,
                    }),
                    reused,
                    skipped: false,
                }
            })
            .collect();

        let modules: Vec<ModuleId> = files.iter().map(|f| ModuleId::new(f.as_str())).collect();
        let edges_by_file: HashMap<&str, &[ModuleId]> = extracted
            .iter()
            .map(|fe| (fe.id.as_str(), fe.targets.as_slice()))
            .collect();
        let graph = DependencyGraph::build(
            &modules,
            modules
                .iter()
                .filter_map(|m| edges_by_file.get(m.as_str()).map(|ts| (m, *ts))),
        );

        let cycles = graph.find_cycles();
        let current_size = GraphSize {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
        };
        let previous_size = previous.as_ref().map(|p| GraphSize::from(&p.result.graph));

        let ((cycle_issues, layer_issues), (coupling_issues, drift_issues)) = rayon::join(
            || {
                rayon::join(
                    || detectors::detect_circular_dependencies(&cycles),
                    || detectors::detect_layer_violations(&graph, &self.classifier),
                )
            },
            || {
                rayon::join(
                    || detectors::detect_high_coupling(&graph, self.config.max_coupling),
                    || drift::detect_drift(current_size, previous_size, &self.config.drift),
                )
            },
        );
        let mut issues = cycle_issues;
        issues.extend(layer_issues);
        issues.extend(coupling_issues);
        issues.extend(drift_issues);

        let incomplete = timed_out.load(Ordering::Relaxed);
        if incomplete {
            warn!(
                budget_ms = self.config.time_budget_ms,
                "time budget exceeded, remaining files analyzed without edges"
            );
        }

        let files_reused = extracted.iter().filter(|fe| fe.reused).count();
        let files_analyzed = extracted
            .iter()
            .filter(|fe| !fe.skipped && !fe.reused)
            .count();
        let duration = started.elapsed();
        let performance = self.config.enable_perf_monitoring.then(|| PerformanceTelemetry {
            duration_ms: duration.as_millis() as u64,
            files_analyzed,
            files_reused,
            cache_hit_ratio: if files.is_empty() {
                0.0
            } else {
                files_reused as f64 / files.len() as f64
            },
        });

        let metrics = metrics::aggregate(&graph, cycles.len(), &issues, performance);
        let result = AnalysisResult {
            issues,
            metrics,
            graph: graph.snapshot_with_cycles(cycles),
            timestamp: chrono::Utc::now().to_rfc3339(),
            scope: selection.scope,
            incomplete,
        };

        let run = CachedRun {
            result,
            files: extracted
                .into_iter()
                .filter_map(|fe| fe.record.map(|r| (fe.id.to_string(), r)))
                .collect(),
        };
        if let Err(e) = self.cache.store(&run) {
            warn!(path = %self.cache.path().display(), error = %format!("{e:#}"), "failed to cache analysis result");
        }

        let result = run.result;
        info!(
            scope = %result.scope,
            files = files.len(),
            extracted = files_analyzed,
            reused = files_reused,
            issues = result.issues.len(),
            score = result.metrics.architecture_score,
            duration_ms = duration.as_millis() as u64,
            "analysis complete"
        );
        result
    }

    /// Content of one walked file, or `None` if it cannot be read as UTF-8.
    fn read_source(&self, rel_path: &str) -> Option<String> {
        match std::fs::read_to_string(self.root.join(rel_path)) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(file = rel_path, error = %e, "failed to read file");
                None
            }
        }
    }

    /// Raw specifiers of one file. Unsupported or unparseable files yield
    /// none.
    fn extract_specifiers(&self, rel_path: &str, content: &str) -> Vec<String> {
        let path = self.root.join(rel_path);
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extractor.file_extensions().contains(&ext));
        if !supported {
            debug!(file = rel_path, extractor = self.extractor.name(), "unsupported extension");
            return Vec::new();
        }

        match self.extractor.extract_specifiers(&path, content) {
            Ok(specs) => specs,
            Err(e) => {
                warn!(file = rel_path, error = %format!("{e:#}"), "failed to extract imports");
                Vec::new()
            }
        }
    }
}

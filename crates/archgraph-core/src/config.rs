use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = ".archgraph.toml";

/// Top-level configuration from `.archgraph.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerConfig>,
    #[serde(default = "default_max_coupling")]
    pub max_coupling: usize,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Worker threads for the file read/extract phase.
    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: usize,
    #[serde(default = "default_true")]
    pub use_incremental: bool,
    #[serde(default = "default_true")]
    pub enable_perf_monitoring: bool,
    /// Cache directory; relative paths are resolved against the workspace root.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_visualization_max_nodes")]
    pub visualization_max_nodes: usize,
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
    #[serde(default)]
    pub drift: DriftConfig,
}

/// A named architectural tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    /// Glob matched against module identifiers.
    pub pattern: String,
    #[serde(default)]
    pub allowed_dependencies: Vec<String>,
}

impl LayerConfig {
    pub fn new(name: &str, pattern: &str, allowed: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            allowed_dependencies: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Relative-change thresholds (percent) for drift detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default = "default_node_change_threshold")]
    pub node_change_threshold: f64,
    #[serde(default = "default_edge_change_threshold")]
    pub edge_change_threshold: f64,
}

fn default_layers() -> Vec<LayerConfig> {
    vec![
        LayerConfig::new(
            "ui",
            "**/{ui,components,pages,views}/**",
            &["ui", "services", "utils"],
        ),
        LayerConfig::new(
            "services",
            "**/{services,api}/**",
            &["services", "data", "utils"],
        ),
        LayerConfig::new(
            "data",
            "**/{data,models,db,repositories}/**",
            &["data", "utils"],
        ),
        LayerConfig::new("utils", "**/{utils,lib,helpers}/**", &["utils"]),
    ]
}

fn default_max_coupling() -> usize {
    10
}

fn default_exclude_patterns() -> Vec<String> {
    [
        "**/node_modules/**",
        "**/dist/**",
        "**/build/**",
        "**/out/**",
        "**/coverage/**",
        "**/.git/**",
        "**/.next/**",
        "**/*.d.ts",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_parallel_workers() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".archgraph")
}

fn default_visualization_max_nodes() -> usize {
    50
}

fn default_node_change_threshold() -> f64 {
    20.0
}

fn default_edge_change_threshold() -> f64 {
    30.0
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            node_change_threshold: default_node_change_threshold(),
            edge_change_threshold: default_edge_change_threshold(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layers: default_layers(),
            max_coupling: default_max_coupling(),
            exclude_patterns: default_exclude_patterns(),
            extensions: default_extensions(),
            parallel_workers: default_parallel_workers(),
            use_incremental: true,
            enable_perf_monitoring: true,
            cache_dir: default_cache_dir(),
            visualization_max_nodes: default_visualization_max_nodes(),
            time_budget_ms: None,
            drift: DriftConfig::default(),
        }
    }
}

/// Compile a glob the way every pattern in this crate is matched: `*` stops
/// at path separators, `**` spans any number of directories.
pub(crate) fn compile_glob(pattern: &str, context: &'static str) -> Result<Glob, ConfigError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| ConfigError::InvalidGlob {
            context,
            pattern: pattern.to_string(),
            source,
        })
}

impl Config {
    /// Load configuration from a `.archgraph.toml` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from `.archgraph.toml` in the given directory or any ancestor.
    /// Defaults apply only when no such file exists; a file that fails to
    /// load is an error.
    pub fn load_or_default(dir: &Path) -> Result<Self, ConfigError> {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                debug!(path = %config_path.display(), "loading config");
                return Self::load(&config_path);
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(Self::default())
    }

    /// Check everything that would otherwise corrupt later phases: globs,
    /// layer references, and numeric ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "extensions",
                reason: "at least one source extension is required".to_string(),
            });
        }
        if self.parallel_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "parallel_workers",
                reason: "must be at least 1".to_string(),
            });
        }
        for (field, value) in [
            ("drift.node_change_threshold", self.drift.node_change_threshold),
            ("drift.edge_change_threshold", self.drift.edge_change_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("expected a non-negative percentage, got {value}"),
                });
            }
        }

        for pattern in &self.exclude_patterns {
            compile_glob(pattern, "exclude")?;
        }

        let mut names = HashSet::new();
        for layer in &self.layers {
            compile_glob(&layer.pattern, "layer")?;
            if !names.insert(layer.name.as_str()) {
                return Err(ConfigError::DuplicateLayer {
                    layer: layer.name.clone(),
                });
            }
        }
        for layer in &self.layers {
            if let Some(unknown) = layer
                .allowed_dependencies
                .iter()
                .find(|dep| !names.contains(dep.as_str()))
            {
                return Err(ConfigError::UnknownLayer {
                    layer: layer.name.clone(),
                    unknown: unknown.clone(),
                });
            }
        }
        Ok(())
    }

    /// Resolve the cache directory against the workspace root.
    pub fn cache_dir_for(&self, root: &Path) -> PathBuf {
        if self.cache_dir.is_absolute() {
            self.cache_dir.clone()
        } else {
            root.join(&self.cache_dir)
        }
    }

    /// Generate default TOML content for `archgraph init`.
    pub fn default_toml() -> String {
        r#"# archgraph - module dependency graph analysis

# Coupling (fan-in + fan-out) above this value is reported
max_coupling = 10
exclude_patterns = ["**/node_modules/**", "**/dist/**", "**/build/**", "**/out/**", "**/coverage/**", "**/.git/**", "**/.next/**", "**/*.d.ts"]
extensions = ["ts", "tsx", "js", "jsx"]

# Threads used to read and scan files
parallel_workers = 8
# Only re-scan files git reports as changed when a previous result is cached
use_incremental = true
enable_perf_monitoring = true
cache_dir = ".archgraph"
visualization_max_nodes = 50
# Stop scanning after this many milliseconds and report partial results
# time_budget_ms = 1500

[drift]
node_change_threshold = 20.0
edge_change_threshold = 30.0

# Layers are checked in order; the first matching pattern wins.
[[layers]]
name = "ui"
pattern = "**/{ui,components,pages,views}/**"
allowed_dependencies = ["ui", "services", "utils"]

[[layers]]
name = "services"
pattern = "**/{services,api}/**"
allowed_dependencies = ["services", "data", "utils"]

[[layers]]
name = "data"
pattern = "**/{data,models,db,repositories}/**"
allowed_dependencies = ["data", "utils"]

[[layers]]
name = "utils"
pattern = "**/{utils,lib,helpers}/**"
allowed_dependencies = ["utils"]
"#
        .to_string()
    }
}

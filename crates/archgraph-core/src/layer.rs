use std::collections::HashSet;

use globset::GlobMatcher;

use crate::config::{compile_glob, LayerConfig};
use crate::error::ConfigError;

/// A compiled layer rule.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    matcher: GlobMatcher,
    allowed: HashSet<String>,
}

impl Layer {
    /// Whether modules in this layer may depend on modules in `other`.
    pub fn allows(&self, other: &str) -> bool {
        self.allowed.contains(other)
    }

    /// Allowed layer names in a stable order, for messages.
    pub fn allowed_sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.allowed.iter().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Classifies module identifiers into layers. Layers are scanned in
/// configuration order and the first match wins.
#[derive(Debug, Clone)]
pub struct LayerClassifier {
    layers: Vec<Layer>,
}

impl LayerClassifier {
    pub fn new(configs: &[LayerConfig]) -> Result<Self, ConfigError> {
        let layers = configs
            .iter()
            .map(|cfg| {
                let glob = compile_glob(&cfg.pattern, "layer")?;
                Ok(Layer {
                    name: cfg.name.clone(),
                    matcher: glob.compile_matcher(),
                    allowed: cfg.allowed_dependencies.iter().cloned().collect(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { layers })
    }

    /// Classify a module identifier. Returns `None` for unclassified modules.
    pub fn classify(&self, id: &str) -> Option<&Layer> {
        let normalized = id.replace('\\', "/");
        self.layers.iter().find(|l| l.matcher.is_match(&normalized))
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

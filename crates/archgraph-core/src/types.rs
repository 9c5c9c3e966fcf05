use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a module node: the workspace-relative, forward-slash path of
/// a source file.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub String);

/// Synthetic node used for findings that concern the whole workspace.
pub const WORKSPACE_NODE: &str = "<workspace>";

impl ModuleId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(normalize_separators(&path.into()))
    }

    pub fn workspace() -> Self {
        Self(WORKSPACE_NODE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Replace Windows separators and strip a leading `./`.
pub fn normalize_separators(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    match normalized.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => normalized,
    }
}

/// Severity of an issue, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" | "med" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" | "crit" => Ok(Severity::Critical),
            _ => Err(anyhow::anyhow!("unknown severity: {s}")),
        }
    }
}

/// Kind of structural finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    CircularDependency,
    LayerViolation,
    HighCoupling,
    ArchitectureDrift,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::CircularDependency => write!(f, "circular-dependency"),
            IssueKind::LayerViolation => write!(f, "layer-violation"),
            IssueKind::HighCoupling => write!(f, "high-coupling"),
            IssueKind::ArchitectureDrift => write!(f, "architecture-drift"),
        }
    }
}

/// Kind-specific payload carried by an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueDetails {
    Cycle {
        cycle: Vec<ModuleId>,
    },
    Layer {
        from_layer: String,
        to_layer: String,
        target: ModuleId,
    },
    Coupling {
        fan_in: usize,
        fan_out: usize,
        coupling: usize,
        threshold: usize,
    },
    Drift {
        previous_nodes: usize,
        current_nodes: usize,
        previous_edges: usize,
        current_edges: usize,
        node_change_pct: f64,
        edge_change_pct: f64,
    },
}

/// A structural finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub node: ModuleId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub details: IssueDetails,
}

/// Which part of the workspace a run extracted edges for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Full,
    Incremental,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Full => write!(f, "full"),
            Scope::Incremental => write!(f, "incremental"),
        }
    }
}

pub mod cache;
pub mod config;
pub mod detectors;
pub mod diagram;
pub mod drift;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod layer;
pub mod metrics;
pub mod pipeline;
pub mod resolve;
pub mod scope;
pub mod types;
pub mod walker;

pub use config::Config;
pub use error::{AnalysisError, ConfigError};
pub use extractor::{ImportExtractor, TextImportScanner};
pub use graph::{DependencyGraph, GraphSnapshot};
pub use metrics::{AnalysisResult, Metrics, PerformanceTelemetry};
pub use pipeline::ArchitectureAnalyzer;
pub use scope::{ChangeSource, GitChangeSource};
pub use types::*;

use std::path::PathBuf;

use thiserror::Error;

/// Problems found while loading or validating configuration. These are the
/// only errors surfaced before any file walking begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{}'. Run `archgraph init` to create a valid config file", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {context} pattern '{pattern}'")]
    InvalidGlob {
        context: &'static str,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("layer '{layer}' is declared more than once")]
    DuplicateLayer { layer: String },

    #[error("layer '{layer}' allows a dependency on unknown layer '{unknown}'")]
    UnknownLayer { layer: String, unknown: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Errors returned by the analyzer's public surface.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("workspace root '{}' is not a directory", path.display())]
    RootNotFound { path: PathBuf },

    #[error("no analysis available: run an analysis before exporting")]
    NoAnalysis,

    #[error("failed to write visualization to '{}'", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

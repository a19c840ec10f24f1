//! Error types for the generation pipeline
//!
//! The pure stages (filter, extract, render with the built-in template) never
//! fail. Everything here belongs to the ambient edges: reading sources, custom
//! templates, configuration, writing outputs, and the optional validation pass.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = CodegenError> = std::result::Result<T, E>;

/// Errors raised by the code generator
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    #[error("template {name} failed: {source}")]
    Template {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("manifest {path:?} is unreadable: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("generated source {file_name} is not valid Rust: {}", errors.join("; "))]
    InvalidGeneratedSource {
        file_name: String,
        errors: Vec<String>,
    },
}

impl CodegenError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn template(name: impl Into<String>, source: tera::Error) -> Self {
        Self::Template {
            name: name.into(),
            source,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error came from a single source file that can be skipped
    ///
    /// Syntax errors and non-UTF-8 sources qualify; the compiler reports both.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Parse { .. } => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::InvalidData,
            _ => false,
        }
    }
}

//! Error types and handling
//!
//! The error taxonomy is split per domain (configuration, rendering, cache,
//! document rewriting, export bundles). Each domain enum is wrapped by
//! [`SlidekitError`] for callers that want a single error type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::ArtifactKind;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: String },

    /// Configuration file I/O error
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),

    /// Configuration file parsing error
    #[error("Failed to parse configuration file: {message}")]
    Parsing { message: String },

    /// Configuration validation error
    #[error("Configuration validation error: {message}")]
    Validation { message: String },
}

/// Errors reported by an external renderer
#[derive(Error, Debug)]
pub enum RenderError {
    /// The renderer executable could not be found
    #[error("Renderer `{program}` is not installed or not on PATH")]
    NotInstalled { program: String },

    /// The renderer exited abnormally
    #[error("Renderer `{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The renderer did not finish in time
    #[error("Renderer timed out after {timeout:?}")]
    TimedOut { timeout: Duration },

    /// The renderer reported success but left an empty file behind
    #[error("Renderer produced no output at {}", path.display())]
    EmptyOutput { path: PathBuf },

    /// I/O error while preparing renderer input or reading its output
    #[error("Renderer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Artifact cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Empty or malformed request, rejected before any filesystem access
    #[error("Invalid cache input: {message}")]
    InvalidInput { message: String },

    /// The external renderer failed for this artifact
    #[error("Failed to render {kind} `{}`: {source}", first_line(.content))]
    RenderFailure {
        kind: ArtifactKind,
        content: String,
        #[source]
        source: RenderError,
    },

    /// Directory creation, existence check or publish failed
    #[error("Cache I/O error at {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Document rewriting errors
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Reading the source document failed
    #[error("Failed to read document {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the rewritten document failed
    #[error("Failed to write document {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A span failed to resolve and the abort policy was selected
    #[error("Preprocessing aborted: {kind} at line {line} failed")]
    Aborted {
        kind: ArtifactKind,
        line: usize,
        #[source]
        source: CacheError,
    },

    /// No `theme:` directive to rewrite
    #[error("No `theme:` directive found in document")]
    ThemeDirectiveMissing,

    /// The expected theme directive is no longer present
    #[error("Theme `{expected}` missing from rewritten document")]
    ThemeLost { expected: String },
}

/// Export bundle errors
#[derive(Error, Debug)]
pub enum BundleError {
    /// Copying or writing into the bundle directory failed
    #[error("Bundle I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A referenced artifact is not present in the cache
    #[error("Referenced artifact missing from cache: {}", path.display())]
    MissingArtifact { path: PathBuf },
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum SlidekitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),
}

/// Convenience type alias for Results with SlidekitError
pub type Result<T> = std::result::Result<T, SlidekitError>;

/// First line of a (possibly multi-line) source, for attribution in messages
pub(crate) fn first_line(content: &str) -> &str {
    content.trim().lines().next().unwrap_or("")
}

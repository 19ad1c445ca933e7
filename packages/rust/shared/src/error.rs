//! Error types for docdigest.
//!
//! Library crates use [`DigestError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docdigest operations.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A requested record (file, summary) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Text generation failed (transport, HTTP status, or unusable response).
    #[error("generation error: {0}")]
    Generation(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (bad chunking parameters, non-UTF-8 text, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DigestError>;

impl DigestError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a not-found error for a file identifier.
    pub fn file_not_found(file_id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("file {file_id}"))
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading.
///
/// Lookups never fail; only loading files can.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration file was not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A non-comment line is not of the form `key = value`.
    #[error("{path}:{line}: expected 'key = value', found '{content}'")]
    Parse {
        /// Path to the file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// The offending line, trimmed.
        content: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new parse error.
    pub fn parse(path: impl Into<PathBuf>, line: usize, content: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            content: content.into(),
        }
    }
}

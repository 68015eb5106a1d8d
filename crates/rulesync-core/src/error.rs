//! Error types for rulesync-core

use std::path::PathBuf;

/// Result type for rulesync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rulesync-core operations
///
/// Per-action write/delete failures are not errors: they are recorded in the
/// execution report and never stop sibling actions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A supplied path does not exist
    #[error("Path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// A supplied path exists but is not a directory
    #[error("Path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid input detected before any mutation
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A rule or exclude pattern could not be compiled
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A file or directory inside a project could not be read
    #[error("Failed to scan {path} in project {project}: {message}")]
    Scan {
        project: String,
        path: String,
        message: String,
    },

    /// Every project failed to scan
    #[error("No projects could be successfully scanned.")]
    AllScansFailed,

    /// The interactive choice capability failed
    #[error("Prompt failed: {message}")]
    Prompt { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem or path-security error from rulesync-fs
    #[error(transparent)]
    Fs(#[from] rulesync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_pattern(pattern: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: source.to_string(),
        }
    }

    /// Whether this error is a path-security rejection.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Fs(e) if e.is_security())
    }
}

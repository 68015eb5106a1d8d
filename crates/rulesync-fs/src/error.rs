//! Error types for rulesync-fs

use std::path::PathBuf;

/// Result type for rulesync-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rulesync-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    /// The decoded path lands outside the base directory.
    #[error("Security error: path traversal attempt detected: {path}")]
    PathTraversal { path: String },

    /// A non-trivial path (e.g. `x/..`) collapses onto the base directory.
    #[error("Security error: path resolves to the base directory itself: {path}")]
    ResolvesToBase { path: String },

    #[error("Security error: path contains a null byte: {path:?}")]
    NullByte { path: String },

    #[error("Security error: path is not valid UTF-8 after decoding: {path}")]
    InvalidEncoding { path: String },

    #[error("Refusing to write through symlink at {path}")]
    SymlinkInPath { path: PathBuf },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from the path-security checks.
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. }
                | Self::ResolvesToBase { .. }
                | Self::NullByte { .. }
                | Self::InvalidEncoding { .. }
        )
    }
}

//! Unified error types for the snitch workspace.
//!
//! Every library crate returns [`Result`]; the binary wraps these in
//! `anyhow` at the top level.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum SnitchError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A permission or capability error.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denied operation.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// The packet capture subsystem failed.
    #[error("capture error: {message}")]
    Capture {
        /// Description of the capture failure.
        message: String,
    },
}

impl SnitchError {
    /// Maps an I/O error on `path` into the closest domain variant.
    ///
    /// `NotFound` and `PermissionDenied` I/O errors become their dedicated
    /// variants so callers can tell "process exited" from "access denied".
    #[must_use]
    pub fn from_io(kind: &'static str, id: impl Into<String>, path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { kind, id: id.into() },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                message: format!("{}: {source}", path.display()),
            },
            _ => Self::Io { path, source },
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, SnitchError>;

//! Error types for the workshop mirror.
//!
//! Most failures inside a reconciliation pass are logged and swallowed so a
//! single bad artifact never aborts the pass. These types are what the
//! fallible building blocks return before that decision is made.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the workshop mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Package inspection errors
    #[error("Archive error in {path}: {message}")]
    Archive {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<zip::result::ZipError>,
    },

    // Remote platform errors
    #[error("Remote platform error: {message}")]
    Platform { message: String },

    // Pipeline errors
    #[error("Reconciliation pass failed: {message}")]
    PassFailed { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

impl From<std::io::Error> for MirrorError {
    fn from(err: std::io::Error) -> Self {
        MirrorError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl MirrorError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MirrorError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create an archive error with path context.
    pub fn archive(err: zip::result::ZipError, path: impl Into<PathBuf>) -> Self {
        MirrorError::Archive {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a remote platform error.
    pub fn platform(message: impl Into<String>) -> Self {
        MirrorError::Platform {
            message: message.into(),
        }
    }

    /// Whether the next refresh is expected to clear this error on its own.
    ///
    /// Platform hiccups and local IO are transient; configuration problems
    /// are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MirrorError::Io { .. }
                | MirrorError::FileNotFound(_)
                | MirrorError::Json { .. }
                | MirrorError::Archive { .. }
                | MirrorError::Platform { .. }
                | MirrorError::PassFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MirrorError::platform("client not initialized");
        assert_eq!(
            err.to_string(),
            "Remote platform error: client not initialized"
        );
    }

    #[test]
    fn test_io_with_path_keeps_path() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = MirrorError::io_with_path(io, "/tmp/avatars.json");
        match err {
            MirrorError::Io { path, .. } => {
                assert_eq!(path, Some(PathBuf::from("/tmp/avatars.json")))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_transient_errors() {
        assert!(MirrorError::platform("offline").is_transient());
        assert!(!MirrorError::Config {
            message: "bad root".into()
        }
        .is_transient());
    }
}

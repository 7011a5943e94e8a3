//! Error types for filesystem operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while touching the filesystem.
#[derive(Debug, Error)]
pub enum FsError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Something already occupies the path.
    #[error("Already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Expected a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file name that cannot be used as a single path component.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The recycle bin refused the item.
    #[error("Could not move {path} to the recycle bin: {message}")]
    RecycleBin { path: PathBuf, message: String },

    /// The operation was cancelled while in progress.
    #[error("Operation cancelled")]
    Cancelled,

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl FsError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            std::io::ErrorKind::NotADirectory => Self::NotADirectory { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The path this error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::PermissionDenied { path }
            | Self::NotFound { path }
            | Self::AlreadyExists { path }
            | Self::NotADirectory { path }
            | Self::Io { path, .. }
            | Self::RecycleBin { path, .. } => Some(path),
            Self::InvalidName { .. } | Self::Cancelled | Self::Other { .. } => None,
        }
    }

    /// Check whether this is the cancellation signal rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check whether the platform refused a rename across devices.
    pub fn is_cross_device(&self) -> bool {
        matches!(
            self,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::CrossesDevices
        )
    }
}

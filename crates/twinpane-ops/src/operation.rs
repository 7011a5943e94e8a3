//! File operation types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use twinpane_core::FsError;

/// Whether a transfer leaves the sources in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMode {
    Copy,
    Move,
}

/// How a deletion disposes of its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteMode {
    /// Remove the items for good, walking the tree ourselves.
    Permanent,
    /// Hand each top-level item to the platform recycle bin.
    RecycleBin,
}

/// A file operation to be executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileOperation {
    /// Copy or move files/directories into a destination directory.
    Transfer {
        sources: Vec<PathBuf>,
        destination: PathBuf,
        mode: TransferMode,
    },
    /// Delete files/directories.
    Delete {
        targets: Vec<PathBuf>,
        mode: DeleteMode,
    },
}

impl FileOperation {
    /// Create a copy operation.
    pub fn copy(sources: Vec<PathBuf>, destination: PathBuf) -> Self {
        Self::Transfer {
            sources,
            destination,
            mode: TransferMode::Copy,
        }
    }

    /// Create a move operation.
    pub fn move_to(sources: Vec<PathBuf>, destination: PathBuf) -> Self {
        Self::Transfer {
            sources,
            destination,
            mode: TransferMode::Move,
        }
    }

    /// Create a delete operation.
    pub fn delete(targets: Vec<PathBuf>, mode: DeleteMode) -> Self {
        Self::Delete { targets, mode }
    }
}

/// An error that occurred during a file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Describe a failed filesystem call, e.g. `Failed to copy: Permission denied: /x`.
    pub fn from_fs(path: PathBuf, action: &str, error: &FsError) -> Self {
        Self::new(path, format!("Failed to {action}: {error}"))
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Every item was handled without error.
    Completed,
    /// The run finished but some items failed.
    CompletedWithErrors,
    /// The user cancelled or aborted the run.
    Cancelled,
    /// The worker died unexpectedly.
    Faulted,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
            Self::CompletedWithErrors => write!(f, "Completed with errors"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Faulted => write!(f, "Faulted"),
        }
    }
}

/// Why a run stopped before working through its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Halt {
    /// The cancellation token fired or a prompt answered Cancel.
    Cancelled,
    /// A conflict or deletion prompt answered Abort.
    Aborted,
}

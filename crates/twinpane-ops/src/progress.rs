//! Progress reporting types for file operations.

use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::{OperationError, Outcome, TransferMode};

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Copy,
    Move,
    Delete,
}

impl From<TransferMode> for OperationType {
    fn from(mode: TransferMode) -> Self {
        match mode {
            TransferMode::Copy => Self::Copy,
            TransferMode::Move => Self::Move,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
            Self::Delete => write!(f, "Delete"),
        }
    }
}

/// Progress snapshot for an ongoing operation.
///
/// Totals only grow as the tree is discovered and counters only grow as
/// items finish, so `items_completed <= items_total` and
/// `bytes_processed <= bytes_total` hold at every snapshot.
#[derive(Debug, Clone)]
pub struct OperationProgress {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of files/directories finished (including skipped ones).
    pub items_completed: usize,
    /// Number of files/directories discovered so far.
    pub items_total: usize,
    /// Number of bytes processed so far.
    pub bytes_processed: u64,
    /// Bytes discovered so far (always 0 for deletions).
    pub bytes_total: u64,
    /// Display name of the item most recently touched.
    pub current_name: Option<CompactString>,
    /// Full path of the item most recently touched.
    pub current_path: Option<PathBuf>,
}

impl OperationProgress {
    /// Create an empty progress tracker for an operation.
    pub fn new(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            items_completed: 0,
            items_total: 0,
            bytes_processed: 0,
            bytes_total: 0,
            current_name: None,
            current_path: None,
        }
    }

    /// Account for newly discovered items.
    pub fn discover(&mut self, items: usize, bytes: u64) {
        self.items_total += items;
        self.bytes_total += bytes;
    }

    /// Increment the completed count and add bytes.
    pub fn complete_item(&mut self, bytes: u64) {
        self.complete_items(1, bytes);
    }

    /// Mark several items finished at once, such as a subtree passed over
    /// whole.
    ///
    /// Totals are raised if the counters would overtake them, which can only
    /// happen when totals were measured before the tree changed.
    pub fn complete_items(&mut self, items: usize, bytes: u64) {
        self.items_completed += items;
        self.bytes_processed += bytes;
        self.items_total = self.items_total.max(self.items_completed);
        self.bytes_total = self.bytes_total.max(self.bytes_processed);
    }

    /// Update the item being processed.
    pub fn set_current(&mut self, name: impl Into<CompactString>, path: PathBuf) {
        self.current_name = Some(name.into());
        self.current_path = Some(path);
    }

    /// Byte counters, or `None` for operations that do not track bytes.
    pub fn bytes(&self) -> Option<(u64, u64)> {
        match self.operation_type {
            OperationType::Delete => None,
            OperationType::Copy | OperationType::Move => {
                Some((self.bytes_processed, self.bytes_total))
            }
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    ///
    /// Transfers are measured in bytes (0 when nothing has a size yet);
    /// deletions, which carry no byte counts, are measured in items.
    pub fn percentage(&self) -> f64 {
        match self.operation_type {
            OperationType::Delete if self.items_total > 0 => {
                (self.items_completed as f64 / self.items_total as f64) * 100.0
            }
            OperationType::Copy | OperationType::Move if self.bytes_total > 0 => {
                (self.bytes_processed as f64 / self.bytes_total as f64) * 100.0
            }
            _ => 0.0,
        }
    }
}

/// Result of a completed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationComplete {
    /// The type of operation.
    pub operation_type: OperationType,
    /// How the run ended.
    pub outcome: Outcome,
    /// Number of items successfully processed.
    pub succeeded: usize,
    /// Number of items skipped by a conflict decision or a Continue.
    pub skipped: usize,
    /// Number of items that failed.
    pub failed: usize,
    /// Total bytes processed.
    pub bytes_processed: u64,
    /// Errors that occurred.
    pub errors: Vec<OperationError>,
}

impl OperationComplete {
    /// Report for a worker that died before producing its own report.
    pub fn faulted(operation_type: OperationType, message: impl Into<String>) -> Self {
        Self {
            operation_type,
            outcome: Outcome::Faulted,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            bytes_processed: 0,
            errors: vec![OperationError::new(PathBuf::new(), message)],
        }
    }

    /// Check if the operation was fully successful.
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Completed
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        let action = match self.operation_type {
            OperationType::Copy => "Copied",
            OperationType::Move => "Moved",
            OperationType::Delete => "Deleted",
        };

        let mut summary = format!("{} {} items", action, self.succeeded);
        if self.skipped > 0 {
            summary.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.failed > 0 {
            summary.push_str(&format!(", {} failed", self.failed));
        }
        match self.outcome {
            Outcome::Cancelled => summary.push_str(" (cancelled)"),
            Outcome::Faulted => summary.push_str(" (faulted)"),
            Outcome::Completed | Outcome::CompletedWithErrors => {}
        }
        summary
    }
}

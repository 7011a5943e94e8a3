//! File transfer and deletion engines for twinpane.
//!
//! [`TransferEngine`] copies or moves trees into a destination directory and
//! [`DeletionEngine`] removes them, permanently or through the recycle bin.
//! Both report to an [`OperationObserver`] and answer to a cancellation
//! token. [`OperationExecutor`] runs them on background tasks and bridges
//! every callback to a channel for a UI event loop.

mod channel;
mod conflict;
mod copy;
mod delete;
mod executor;
mod move_op;
mod observer;
mod operation;
mod progress;
mod recycle;
mod transfer;
mod walk;

pub use channel::{ChannelObserver, OperationEvent, Prompt};
pub use conflict::{
    Conflict, ConflictDecision, ConflictKind, ConflictResolver, ConflictResponse,
    suggest_rename_path, validate_new_name,
};
pub use delete::DeletionEngine;
pub use executor::{OperationExecutor, OperationHandle};
pub use observer::{DeleteErrorAction, OperationObserver, TransferErrorAction};
pub use operation::{DeleteMode, FileOperation, OperationError, Outcome, TransferMode};
pub use progress::{OperationComplete, OperationProgress, OperationType};
pub use recycle::{RecycleBin, SystemRecycleBin};
pub use transfer::{TransferEngine, TransferJob};

pub use tokio_util::sync::CancellationToken;

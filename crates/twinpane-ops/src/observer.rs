//! The seam between a running engine and whatever presents it to the user.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{Conflict, ConflictResponse, OperationError, OperationProgress};

/// Answer to a failed transfer item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferErrorAction {
    /// Try the same item again from scratch.
    Retry,
    /// Cancel the whole run.
    Cancel,
}

/// Answer to a failed deletion item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteErrorAction {
    /// Leave the item and carry on with the rest of the queue.
    Continue,
    /// Stop the remaining queue.
    Abort,
}

/// Receives progress and answers prompts for a single run.
///
/// The worker awaits every call before it touches the filesystem again, so a
/// prompt blocks the run until it is answered. Cancellation is not observed
/// while a prompt is outstanding; a prompt's own Cancel/Abort answer is the
/// way out of it.
pub trait OperationObserver: Send {
    /// Called after every item, and before each deletion.
    fn on_progress(&mut self, progress: &OperationProgress) -> impl Future<Output = ()> + Send;

    /// Called when a destination already exists and no decision is cached.
    fn on_conflict(&mut self, conflict: &Conflict) -> impl Future<Output = ConflictResponse> + Send;

    /// Called when copying or moving an item failed.
    fn on_transfer_error(
        &mut self,
        error: &OperationError,
    ) -> impl Future<Output = TransferErrorAction> + Send;

    /// Called when deleting an item failed.
    fn on_delete_error(
        &mut self,
        error: &OperationError,
    ) -> impl Future<Output = DeleteErrorAction> + Send;
}

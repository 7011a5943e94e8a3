//! Channel bridge between a background worker and a UI event loop.

use tokio::sync::{mpsc, oneshot};

use crate::{
    Conflict, ConflictResponse, DeleteErrorAction, OperationComplete, OperationError,
    OperationObserver, OperationProgress, TransferErrorAction,
};

/// A question from the worker that must be answered before it continues.
#[derive(Debug)]
pub struct Prompt<T, R> {
    subject: T,
    reply: oneshot::Sender<R>,
}

impl<T, R> Prompt<T, R> {
    fn new(subject: T, reply: oneshot::Sender<R>) -> Self {
        Self { subject, reply }
    }

    /// What the worker is asking about.
    pub fn subject(&self) -> &T {
        &self.subject
    }

    /// Answer the prompt and let the worker continue.
    pub fn respond(self, answer: R) {
        // The worker treats a vanished reply as cancel, so a closed channel
        // on its side needs no handling here.
        let _ = self.reply.send(answer);
    }
}

/// Event sent from a worker to the UI.
#[derive(Debug)]
pub enum OperationEvent {
    /// Progress update.
    Progress(OperationProgress),
    /// A conflict needs a decision.
    Conflict(Prompt<Conflict, ConflictResponse>),
    /// A transfer item failed: retry or cancel?
    TransferError(Prompt<OperationError, TransferErrorAction>),
    /// A deletion item failed: continue or abort?
    DeleteError(Prompt<OperationError, DeleteErrorAction>),
    /// The operation completed.
    Complete(OperationComplete),
}

/// An [`OperationObserver`] that forwards everything over a channel.
///
/// If the receiving side goes away, prompts are answered with Abort/Cancel so
/// the run winds down instead of waiting forever.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<OperationEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiver the UI should drain.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OperationEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Send the final report.
    pub async fn finish(self, complete: OperationComplete) {
        let _ = self.tx.send(OperationEvent::Complete(complete)).await;
    }

    async fn ask<T, R>(
        &self,
        subject: T,
        wrap: fn(Prompt<T, R>) -> OperationEvent,
        fallback: R,
    ) -> R {
        let (reply, answer) = oneshot::channel();
        if self.tx.send(wrap(Prompt::new(subject, reply))).await.is_err() {
            return fallback;
        }
        answer.await.unwrap_or(fallback)
    }
}

impl OperationObserver for ChannelObserver {
    async fn on_progress(&mut self, progress: &OperationProgress) {
        let _ = self.tx.send(OperationEvent::Progress(progress.clone())).await;
    }

    async fn on_conflict(&mut self, conflict: &Conflict) -> ConflictResponse {
        self.ask(
            conflict.clone(),
            OperationEvent::Conflict,
            ConflictResponse::abort(),
        )
        .await
    }

    async fn on_transfer_error(&mut self, error: &OperationError) -> TransferErrorAction {
        self.ask(
            error.clone(),
            OperationEvent::TransferError,
            TransferErrorAction::Cancel,
        )
        .await
    }

    async fn on_delete_error(&mut self, error: &OperationError) -> DeleteErrorAction {
        self.ask(
            error.clone(),
            OperationEvent::DeleteError,
            DeleteErrorAction::Abort,
        )
        .await
    }
}

//! Runs engines on background tasks and hands the UI a handle to drive them.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use twinpane_core::EngineConfig;

use crate::{
    ChannelObserver, ConflictDecision, DeleteMode, DeletionEngine, FileOperation,
    OperationComplete, OperationEvent, OperationType, RecycleBin, SystemRecycleBin,
    TransferEngine, TransferJob, TransferMode,
};

/// Executor for file operations with a unified interface.
///
/// Every call spawns one worker task and returns immediately.
#[derive(Clone)]
pub struct OperationExecutor {
    config: EngineConfig,
    recycle_bin: Arc<dyn RecycleBin>,
    /// Conflict decision applied to all collisions without prompting.
    default_resolution: Option<ConflictDecision>,
}

impl Default for OperationExecutor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl OperationExecutor {
    /// Create an executor backed by the system recycle bin.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            recycle_bin: Arc::new(SystemRecycleBin),
            default_resolution: None,
        }
    }

    /// Replace the recycle bin facility.
    pub fn with_recycle_bin(mut self, recycle_bin: Arc<dyn RecycleBin>) -> Self {
        self.recycle_bin = recycle_bin;
        self
    }

    /// Set the default conflict resolution.
    pub fn with_resolution(mut self, resolution: ConflictDecision) -> Self {
        self.default_resolution = Some(resolution);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a copy operation.
    pub fn copy(&self, sources: Vec<PathBuf>, destination: PathBuf) -> OperationHandle {
        self.transfer(TransferJob::new(sources, destination, TransferMode::Copy))
    }

    /// Execute a move operation.
    pub fn move_to(&self, sources: Vec<PathBuf>, destination: PathBuf) -> OperationHandle {
        self.transfer(TransferJob::new(sources, destination, TransferMode::Move))
    }

    /// Execute any [`FileOperation`].
    pub fn execute(&self, operation: FileOperation) -> OperationHandle {
        match operation {
            FileOperation::Transfer {
                sources,
                destination,
                mode,
            } => self.transfer(TransferJob::new(sources, destination, mode)),
            FileOperation::Delete { targets, mode } => self.delete(targets, mode),
        }
    }

    /// Execute a copy or move.
    pub fn transfer(&self, job: TransferJob) -> OperationHandle {
        let cancel = CancellationToken::new();
        let engine = TransferEngine::new(self.config.clone(), Arc::clone(&self.recycle_bin))
            .with_cancellation(cancel.clone())
            .with_conflict_default(self.default_resolution.clone());
        let (mut observer, events) = ChannelObserver::channel(self.config.channel_size);
        let operation_type = OperationType::from(job.mode);

        let task = tokio::spawn(async move {
            let complete = engine.run(job, &mut observer).await;
            observer.finish(complete.clone()).await;
            complete
        });

        OperationHandle {
            operation_type,
            events,
            cancel,
            task,
        }
    }

    /// Execute a deletion.
    pub fn delete(&self, targets: Vec<PathBuf>, mode: DeleteMode) -> OperationHandle {
        let cancel = CancellationToken::new();
        let engine = DeletionEngine::new(self.config.clone(), Arc::clone(&self.recycle_bin))
            .with_cancellation(cancel.clone());
        let (mut observer, events) = ChannelObserver::channel(self.config.channel_size);

        let task = tokio::spawn(async move {
            let complete = engine.run(targets, mode, &mut observer).await;
            observer.finish(complete.clone()).await;
            complete
        });

        OperationHandle {
            operation_type: OperationType::Delete,
            events,
            cancel,
            task,
        }
    }
}

/// A running operation.
///
/// Drain [`next_event`](Self::next_event) until it returns `None` (or a
/// `Complete` event), answering prompts as they arrive, then call
/// [`wait`](Self::wait) for the final report.
#[derive(Debug)]
pub struct OperationHandle {
    operation_type: OperationType,
    events: mpsc::Receiver<OperationEvent>,
    cancel: CancellationToken,
    task: JoinHandle<OperationComplete>,
}

impl OperationHandle {
    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    /// Next progress update, prompt, or the completion report.
    pub async fn next_event(&mut self) -> Option<OperationEvent> {
        self.events.recv().await
    }

    /// Request cancellation; the worker stops within one item or one chunk.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the worker to finish.
    ///
    /// Pending and future prompts are answered with Abort/Cancel once the
    /// event receiver is gone. A worker that panicked yields a `Faulted`
    /// report.
    pub async fn wait(self) -> OperationComplete {
        let Self {
            operation_type,
            events,
            task,
            ..
        } = self;
        drop(events);

        match task.await {
            Ok(complete) => complete,
            Err(e) => {
                tracing::error!(operation = %operation_type, error = %e, "operation worker failed");
                let message = if e.is_panic() {
                    "Operation worker panicked"
                } else {
                    "Operation worker was stopped"
                };
                OperationComplete::faulted(operation_type, message)
            }
        }
    }
}

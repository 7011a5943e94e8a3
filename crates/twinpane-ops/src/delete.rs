//! Permanent and recycle-bin deletion.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use twinpane_core::{EngineConfig, FileSystemEntry, FsError};

use crate::copy::run_blocking;
use crate::operation::Halt;
use crate::walk::{collect_tree, stat_roots};
use crate::{
    DeleteErrorAction, DeleteMode, OperationComplete, OperationError, OperationObserver,
    OperationProgress, OperationType, Outcome, RecycleBin,
};

/// Deletes files and directory trees.
///
/// Permanent deletion walks the trees itself and removes every file before
/// any directory, deepest directories first. Recycle-bin deletion hands each
/// top-level path to the [`RecycleBin`] as a whole.
#[derive(Clone)]
pub struct DeletionEngine {
    config: Arc<EngineConfig>,
    recycle_bin: Arc<dyn RecycleBin>,
    cancel: CancellationToken,
}

impl DeletionEngine {
    pub fn new(config: EngineConfig, recycle_bin: Arc<dyn RecycleBin>) -> Self {
        Self {
            config: Arc::new(config),
            recycle_bin,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Delete `targets`, reporting to `observer`.
    pub async fn run<O: OperationObserver>(
        &self,
        targets: Vec<PathBuf>,
        mode: DeleteMode,
        observer: &mut O,
    ) -> OperationComplete {
        tracing::info!(?mode, targets = targets.len(), "starting deletion");

        let roots = run_blocking(move || Ok(stat_roots(targets)))
            .await
            .unwrap_or_default();

        let queue = match mode {
            DeleteMode::RecycleBin => roots,
            DeleteMode::Permanent => {
                let (mut files, mut dirs) = run_blocking(move || Ok(collect_tree(roots)))
                    .await
                    .unwrap_or_default();
                dirs.reverse();
                files.append(&mut dirs);
                files
            }
        };

        let mut run = DeleteRun {
            engine: self,
            observer,
            mode,
            progress: OperationProgress::new(OperationType::Delete),
            succeeded: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
            left_behind: Vec::new(),
        };
        run.progress.discover(queue.len(), 0);

        let result = run.delete_all(queue).await;
        run.finish(result)
    }
}

struct DeleteRun<'a, O> {
    engine: &'a DeletionEngine,
    observer: &'a mut O,
    mode: DeleteMode,
    progress: OperationProgress,
    succeeded: usize,
    skipped: usize,
    failed: usize,
    errors: Vec<OperationError>,
    /// Items still on disk after their turn; their ancestors cannot go.
    left_behind: Vec<PathBuf>,
}

impl<O: OperationObserver> DeleteRun<'_, O> {
    async fn delete_all(&mut self, queue: Vec<FileSystemEntry>) -> Result<(), Halt> {
        let pacing = self.engine.config.delete_pacing();

        for entry in queue {
            self.check_cancelled()?;

            if entry.is_dir() && self.left_behind.iter().any(|p| p.starts_with(&entry.path)) {
                tracing::debug!(path = %entry.path.display(), "keeping non-empty directory");
                self.skipped += 1;
                self.left_behind.push(entry.path.clone());
                self.progress.complete_item(0);
                continue;
            }

            self.progress
                .set_current(entry.name.clone(), entry.path.clone());
            self.observer.on_progress(&self.progress).await;

            if !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
            self.check_cancelled()?;

            match self.delete_one(&entry).await {
                Ok(()) => self.succeeded += 1,
                Err(FsError::NotFound { .. }) => {
                    tracing::debug!(path = %entry.path.display(), "already gone");
                    self.succeeded += 1;
                }
                Err(e) => {
                    let error = OperationError::from_fs(entry.path.clone(), self.verb(), &e);
                    tracing::warn!(path = %entry.path.display(), error = %e, "deletion failed");
                    let action = self.observer.on_delete_error(&error).await;
                    self.failed += 1;
                    self.errors.push(error);
                    match action {
                        DeleteErrorAction::Continue => {
                            self.left_behind.push(entry.path.clone());
                        }
                        DeleteErrorAction::Abort => return Err(Halt::Aborted),
                    }
                }
            }
            self.progress.complete_item(0);
        }

        Ok(())
    }

    async fn delete_one(&mut self, entry: &FileSystemEntry) -> Result<(), FsError> {
        let entry = entry.clone();
        let recycle_bin = Arc::clone(&self.engine.recycle_bin);
        let mode = self.mode;
        run_blocking(move || match mode {
            DeleteMode::RecycleBin => recycle_bin.move_to_recycle_bin(&entry.path),
            DeleteMode::Permanent if entry.is_dir() => {
                fs::remove_dir(&entry.path).map_err(|e| FsError::io(&entry.path, e))
            }
            DeleteMode::Permanent => remove_file_or_link(&entry.path),
        })
        .await
    }

    fn verb(&self) -> &'static str {
        match self.mode {
            DeleteMode::Permanent => "delete",
            DeleteMode::RecycleBin => "move to recycle bin",
        }
    }

    fn check_cancelled(&self) -> Result<(), Halt> {
        if self.engine.cancel.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    fn finish(self, result: Result<(), Halt>) -> OperationComplete {
        let outcome = match result {
            Err(halt) => {
                tracing::info!(?halt, "deletion stopped early");
                Outcome::Cancelled
            }
            Ok(()) if self.errors.is_empty() => Outcome::Completed,
            Ok(()) => Outcome::CompletedWithErrors,
        };

        tracing::info!(
            %outcome,
            succeeded = self.succeeded,
            skipped = self.skipped,
            failed = self.failed,
            "deletion finished"
        );

        OperationComplete {
            operation_type: OperationType::Delete,
            outcome,
            succeeded: self.succeeded,
            skipped: self.skipped,
            failed: self.failed,
            bytes_processed: 0,
            errors: self.errors,
        }
    }
}

/// Remove a file or a symbolic link (never its target).
pub(crate) fn remove_file_or_link(path: &Path) -> Result<(), FsError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        // Directory links on Windows are removed as directories.
        Err(_) if cfg!(windows) && path.is_dir() => {
            fs::remove_dir(path).map_err(|e| FsError::io(path, e))
        }
        Err(e) => Err(FsError::io(path, e)),
    }
}

/// Remove whatever is at `path`, including whole directory trees.
pub(crate) fn remove_path(path: &Path) -> Result<(), FsError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| FsError::io(path, e))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|e| FsError::io(path, e))
    } else {
        remove_file_or_link(path)
    }
}

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use twinpane_core::{EngineConfig, FsError};
use twinpane_ops::{
    CancellationToken, Conflict, ConflictDecision, ConflictResponse, DeleteErrorAction,
    OperationError, OperationObserver, OperationProgress, RecycleBin, TransferErrorAction,
};

/// Engine config without deletion pacing.
pub fn test_config() -> EngineConfig {
    EngineConfig::builder()
        .delete_pacing_ms(0u64)
        .build()
        .unwrap()
}

/// Observer that answers prompts from queues and records everything.
///
/// An empty conflict queue answers Abort; empty error queues answer
/// Cancel/Abort.
#[derive(Default)]
pub struct ScriptedObserver {
    pub conflict_answers: VecDeque<ConflictResponse>,
    pub transfer_error_answers: VecDeque<TransferErrorAction>,
    pub delete_error_answers: VecDeque<DeleteErrorAction>,
    pub cancel_at: Option<(usize, CancellationToken)>,

    pub progress: Vec<OperationProgress>,
    pub conflicts: Vec<Conflict>,
    pub errors: Vec<OperationError>,
}

impl ScriptedObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(answers: impl IntoIterator<Item = ConflictResponse>) -> Self {
        Self {
            conflict_answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Fire `token` once `items` items have completed.
    pub fn cancel_after(mut self, items: usize, token: CancellationToken) -> Self {
        self.cancel_at = Some((items, token));
        self
    }

    pub fn on_transfer_errors(mut self, answers: impl IntoIterator<Item = TransferErrorAction>) -> Self {
        self.transfer_error_answers = answers.into_iter().collect();
        self
    }

    pub fn on_delete_errors(mut self, answers: impl IntoIterator<Item = DeleteErrorAction>) -> Self {
        self.delete_error_answers = answers.into_iter().collect();
        self
    }

    /// Paths reported as current, in order.
    pub fn current_paths(&self) -> Vec<PathBuf> {
        self.progress
            .iter()
            .filter_map(|p| p.current_path.clone())
            .collect()
    }
}

impl OperationObserver for ScriptedObserver {
    async fn on_progress(&mut self, progress: &OperationProgress) {
        self.progress.push(progress.clone());
        if let Some((items, token)) = &self.cancel_at {
            if progress.items_completed >= *items {
                token.cancel();
            }
        }
    }

    async fn on_conflict(&mut self, conflict: &Conflict) -> ConflictResponse {
        self.conflicts.push(conflict.clone());
        self.conflict_answers
            .pop_front()
            .unwrap_or_else(|| ConflictResponse::once(ConflictDecision::Abort))
    }

    async fn on_transfer_error(&mut self, error: &OperationError) -> TransferErrorAction {
        self.errors.push(error.clone());
        self.transfer_error_answers
            .pop_front()
            .unwrap_or(TransferErrorAction::Cancel)
    }

    async fn on_delete_error(&mut self, error: &OperationError) -> DeleteErrorAction {
        self.errors.push(error.clone());
        self.delete_error_answers
            .pop_front()
            .unwrap_or(DeleteErrorAction::Abort)
    }
}

/// Recycle bin that moves items into a scratch directory.
pub struct FakeRecycleBin {
    bin: PathBuf,
    failures: AtomicUsize,
    pub recycled: Mutex<Vec<PathBuf>>,
}

impl FakeRecycleBin {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        let bin = bin.into();
        fs::create_dir_all(&bin).unwrap();
        Self {
            bin,
            failures: AtomicUsize::new(0),
            recycled: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `count` calls.
    pub fn failing(self, count: usize) -> Self {
        self.failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn recycled(&self) -> Vec<PathBuf> {
        self.recycled.lock().unwrap().clone()
    }

    /// Where the n-th recycled item ended up.
    pub fn slot(&self, index: usize) -> PathBuf {
        self.bin.join(index.to_string())
    }
}

impl RecycleBin for FakeRecycleBin {
    fn move_to_recycle_bin(&self, path: &Path) -> Result<(), FsError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(FsError::RecycleBin {
                path: path.to_path_buf(),
                message: "recycle bin unavailable".to_string(),
            });
        }

        let mut recycled = self.recycled.lock().unwrap();
        fs::rename(path, self.slot(recycled.len())).map_err(|e| FsError::io(path, e))?;
        recycled.push(path.to_path_buf());
        Ok(())
    }
}

/// Write `contents` to `path`, creating parent directories.
pub fn write(path: impl AsRef<Path>, contents: &str) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

pub fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

/// Every file under `root` with its contents, relative and sorted.
pub fn snapshot(root: &Path) -> Vec<(PathBuf, String)> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                files.push((relative, read(&path)));
            }
        }
    }
    files.sort();
    files
}

/// Check the progress invariants over every recorded snapshot.
pub fn assert_counters_bounded(progress: &[OperationProgress]) {
    for p in progress {
        assert!(
            p.items_completed <= p.items_total,
            "items {} > {}",
            p.items_completed,
            p.items_total
        );
        assert!(
            p.bytes_processed <= p.bytes_total,
            "bytes {} > {}",
            p.bytes_processed,
            p.bytes_total
        );
    }
}

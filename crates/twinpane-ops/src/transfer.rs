//! Recursive copy and move.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use twinpane_core::{EngineConfig, FileSystemEntry, FsError};

use crate::copy::{CopyReport, apply_metadata, copy_entry, run_blocking};
use crate::delete::remove_path;
use crate::move_op::move_entry;
use crate::operation::Halt;
use crate::walk::{list_dir, measure, stat_roots};
use crate::{
    Conflict, ConflictDecision, ConflictResolver, OperationComplete, OperationError,
    OperationObserver, OperationProgress, Outcome, RecycleBin, TransferErrorAction, TransferMode,
};

type LevelFuture<'s> = Pin<Box<dyn Future<Output = Result<bool, Halt>> + Send + 's>>;

/// A copy or move request. Every source lands directly inside `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    /// Top-level paths, processed in this order.
    pub sources: Vec<PathBuf>,
    /// Target directory; created if missing.
    pub destination: PathBuf,
    /// Copy or move.
    pub mode: TransferMode,
}

impl TransferJob {
    pub fn new(sources: Vec<PathBuf>, destination: impl Into<PathBuf>, mode: TransferMode) -> Self {
        Self {
            sources,
            destination: destination.into(),
            mode,
        }
    }
}

/// Copies or moves trees into a destination directory.
///
/// The engine is reusable; every [`run`](Self::run) gets fresh counters and
/// a fresh conflict cache. Cancellation is shared through the token.
#[derive(Clone)]
pub struct TransferEngine {
    config: Arc<EngineConfig>,
    recycle_bin: Arc<dyn RecycleBin>,
    cancel: CancellationToken,
    conflict_default: Option<ConflictDecision>,
}

impl TransferEngine {
    pub fn new(config: EngineConfig, recycle_bin: Arc<dyn RecycleBin>) -> Self {
        Self {
            config: Arc::new(config),
            recycle_bin,
            cancel: CancellationToken::new(),
            conflict_default: None,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Start every run as if `decision` had already been applied to all.
    pub fn with_conflict_default(mut self, decision: Option<ConflictDecision>) -> Self {
        self.conflict_default = decision;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Transfer `job.sources` into `job.destination`, reporting to `observer`.
    pub async fn run<O: OperationObserver>(
        &self,
        job: TransferJob,
        observer: &mut O,
    ) -> OperationComplete {
        tracing::info!(
            mode = ?job.mode,
            sources = job.sources.len(),
            destination = %job.destination.display(),
            "starting transfer"
        );

        let mut run = TransferRun {
            engine: self,
            observer,
            mode: job.mode,
            resolver: ConflictResolver::with_default(self.conflict_default.clone()),
            progress: OperationProgress::new(job.mode.into()),
            succeeded: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
        };

        if let Err(halt) = run.check_cancelled() {
            return run.finish(Err(halt));
        }

        let destination = job.destination.clone();
        let dest_root = match run_blocking(move || prepare_destination(&destination)).await {
            Ok(root) => root,
            Err(e) => {
                tracing::error!(destination = %job.destination.display(), error = %e, "unusable destination");
                run.errors.push(OperationError::from_fs(
                    job.destination.clone(),
                    "prepare destination",
                    &e,
                ));
                return run.finish(Ok(false));
            }
        };

        let sources = job.sources;
        let roots = run_blocking(move || Ok(stat_roots(sources)))
            .await
            .unwrap_or_default();

        if self.config.precompute_totals {
            let measured = roots.clone();
            let (items, bytes) = run_blocking(move || Ok(measure(&measured)))
                .await
                .unwrap_or_default();
            tracing::debug!(items, bytes, "measured transfer");
            run.progress.discover(items, bytes);
        }

        let result = run
            .transfer_level(roots, &job.destination, Some(&dest_root))
            .await;
        run.finish(result)
    }
}

/// Where an item will be written, as settled by conflict resolution.
#[derive(Debug)]
struct Placement {
    target: PathBuf,
    /// Something settled as replaceable sits at `target`.
    replace: bool,
    /// A previous attempt may have left partial output at `target`.
    attempted: bool,
}

impl Placement {
    fn new(target: PathBuf, replace: bool) -> Self {
        Self {
            target,
            replace,
            attempted: false,
        }
    }
}

/// State of a single run.
struct TransferRun<'a, O> {
    engine: &'a TransferEngine,
    observer: &'a mut O,
    mode: TransferMode,
    resolver: ConflictResolver,
    progress: OperationProgress,
    succeeded: usize,
    skipped: usize,
    failed: usize,
    errors: Vec<OperationError>,
}

impl<O: OperationObserver> TransferRun<'_, O> {
    fn verb(&self) -> &'static str {
        match self.mode {
            TransferMode::Copy => "copy",
            TransferMode::Move => "move",
        }
    }

    fn check_cancelled(&self) -> Result<(), Halt> {
        if self.engine.cancel.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Transfer one directory level: files first, then directories, in
    /// enumeration order. Resolves to whether everything at this level and
    /// below made it to the destination.
    fn transfer_level<'s>(
        &'s mut self,
        entries: Vec<FileSystemEntry>,
        dest_dir: &'s Path,
        guard: Option<&'s Path>,
    ) -> LevelFuture<'s> {
        Box::pin(async move {
            let (dirs, files): (Vec<_>, Vec<_>) =
                entries.into_iter().partition(FileSystemEntry::is_dir);

            if !self.engine.config.precompute_totals {
                let bytes: u64 = files.iter().map(|f| f.size).sum();
                self.progress.discover(files.len() + dirs.len(), bytes);
            }

            let mut complete = true;
            for file in &files {
                complete &= self.transfer_file(file, dest_dir, guard).await?;
            }
            for dir in &dirs {
                complete &= self.transfer_dir(dir, dest_dir, guard).await?;
            }
            Ok(complete)
        })
    }

    async fn transfer_file(
        &mut self,
        entry: &FileSystemEntry,
        dest_dir: &Path,
        guard: Option<&Path>,
    ) -> Result<bool, Halt> {
        self.check_cancelled()?;

        if let Some(root) = guard {
            if let Some(reason) = self.self_transfer(entry, root).await {
                self.reject(entry, reason).await;
                return Ok(false);
            }
        }

        let Some(mut placement) = self
            .settle_collision(entry, dest_dir.join(entry.file_name()))
            .await?
        else {
            self.skip(entry).await;
            return Ok(false);
        };

        loop {
            self.check_cancelled()?;
            match self.place_file(entry, &mut placement).await {
                Ok(report) => {
                    self.record_success(entry, &placement.target, report).await;
                    return Ok(true);
                }
                Err(FsError::Cancelled) => return Err(Halt::Cancelled),
                Err(e) => {
                    let error = OperationError::from_fs(entry.path.clone(), self.verb(), &e);
                    self.retry_or_cancel(error).await?;
                }
            }
        }
    }

    async fn transfer_dir(
        &mut self,
        entry: &FileSystemEntry,
        dest_dir: &Path,
        guard: Option<&Path>,
    ) -> Result<bool, Halt> {
        self.check_cancelled()?;

        if let Some(root) = guard {
            if let Some(reason) = self.self_transfer(entry, root).await {
                self.reject(entry, reason).await;
                return Ok(false);
            }
        }

        let Some(placement) = self
            .settle_collision(entry, dest_dir.join(entry.file_name()))
            .await?
        else {
            self.skip(entry).await;
            return Ok(false);
        };
        let target = placement.target;

        loop {
            self.check_cancelled()?;
            match self.prepare_directory(&target).await {
                Ok(()) => break,
                Err(e) => {
                    let error = OperationError::from_fs(target.clone(), "create directory", &e);
                    self.retry_or_cancel(error).await?;
                }
            }
        }
        self.succeeded += 1;
        self.complete(entry, 1, 0).await;

        let source = entry.path.clone();
        let listing = run_blocking(move || Ok(list_dir(&source)))
            .await
            .unwrap_or_default();
        let mut complete = listing.complete;
        complete &= self.transfer_level(listing.entries, &target, None).await?;

        self.apply_directory_metadata(entry, &target).await;

        if self.mode == TransferMode::Move {
            if !complete {
                tracing::debug!(
                    path = %entry.path.display(),
                    "keeping source directory, not everything was moved"
                );
                return Ok(false);
            }
            self.remove_source_dir(entry).await?;
        }
        Ok(complete)
    }

    /// Refuse to put a top-level source onto itself or inside itself.
    async fn self_transfer(&mut self, entry: &FileSystemEntry, dest_root: &Path) -> Option<String> {
        let source = entry.path.clone();
        let is_dir = entry.is_dir();
        let dest_root = dest_root.to_path_buf();
        let verb = self.verb();
        run_blocking(move || Ok(self_transfer_reason(&source, is_dir, &dest_root, verb)))
            .await
            .ok()
            .flatten()
    }

    /// Turn a collision at `target` into a placement, or `None` to skip.
    async fn settle_collision(
        &mut self,
        entry: &FileSystemEntry,
        mut target: PathBuf,
    ) -> Result<Option<Placement>, Halt> {
        loop {
            let candidate = target.clone();
            let source = entry.clone();
            let found = run_blocking(move || {
                Ok(FileSystemEntry::try_stat(&candidate).map(|existing| Conflict::new(source, existing)))
            })
            .await;
            let conflict = match found {
                Ok(Some(conflict)) => conflict,
                Ok(None) => return Ok(Some(Placement::new(target, false))),
                Err(e) => {
                    tracing::error!(path = %target.display(), error = %e, "cannot check destination");
                    self.failed += 1;
                    self.errors
                        .push(OperationError::from_fs(target, "check destination", &e));
                    return Err(Halt::Cancelled);
                }
            };
            let decision = self.resolver.resolve(&conflict, &mut *self.observer).await;
            tracing::debug!(path = %target.display(), ?decision, "conflict resolved");

            return match decision {
                ConflictDecision::Abort => Err(Halt::Aborted),
                ConflictDecision::Skip => Ok(None),
                ConflictDecision::Overwrite => Ok(Some(Placement::new(target, true))),
                ConflictDecision::OverwriteIfNewer => Ok(entry
                    .is_newer_than(&conflict.destination)
                    .then(|| Placement::new(target, true))),
                ConflictDecision::Rename(name) => {
                    // A taken name is a new collision in its own right.
                    target.set_file_name(name);
                    continue;
                }
            };
        }
    }

    async fn place_file(
        &mut self,
        entry: &FileSystemEntry,
        placement: &mut Placement,
    ) -> Result<CopyReport, FsError> {
        if placement.replace {
            self.clear_destination(&placement.target).await?;
            placement.replace = false;
        }
        if placement.attempted {
            let target = placement.target.clone();
            run_blocking(move || discard_leftover(&target)).await?;
        }
        placement.attempted = true;

        let entry = entry.clone();
        let target = placement.target.clone();
        let config = Arc::clone(&self.engine.config);
        let cancel = self.engine.cancel.clone();
        let mode = self.mode;
        run_blocking(move || {
            if cancel.is_cancelled() {
                return Err(FsError::Cancelled);
            }
            match mode {
                TransferMode::Copy => copy_entry(&entry, &target, &config, &cancel),
                TransferMode::Move => move_entry(&entry, &target, &config, &cancel),
            }
        })
        .await
    }

    /// Get a replaced item out of the way, through the recycle bin unless
    /// configured otherwise.
    async fn clear_destination(&mut self, target: &Path) -> Result<(), FsError> {
        let target = target.to_path_buf();
        let recycle_bin = Arc::clone(&self.engine.recycle_bin);
        let recycle = self.engine.config.recycle_replaced;
        run_blocking(move || {
            if fs::symlink_metadata(&target).is_err() {
                return Ok(());
            }
            tracing::debug!(path = %target.display(), recycle, "clearing replaced destination");
            if recycle {
                recycle_bin.move_to_recycle_bin(&target)
            } else {
                remove_path(&target)
            }
        })
        .await
    }

    /// Make sure `target` is a directory. An existing directory is merged
    /// into; anything else in the way is cleared first.
    async fn prepare_directory(&mut self, target: &Path) -> Result<(), FsError> {
        let candidate = target.to_path_buf();
        let existing = run_blocking(move || {
            Ok(fs::symlink_metadata(&candidate).ok().map(|metadata| metadata.is_dir()))
        })
        .await?;
        match existing {
            Some(true) => return Ok(()),
            Some(false) => self.clear_destination(target).await?,
            None => {}
        }
        let target = target.to_path_buf();
        run_blocking(move || fs::create_dir(&target).map_err(|e| FsError::io(&target, e))).await
    }

    async fn apply_directory_metadata(&mut self, entry: &FileSystemEntry, target: &Path) {
        let config = Arc::clone(&self.engine.config);
        if !config.preserve_timestamps && !config.preserve_attributes {
            return;
        }

        let snapshot = entry.clone();
        let dest = target.to_path_buf();
        if let Err(e) = run_blocking(move || apply_metadata(&snapshot, &dest, &config)).await {
            tracing::warn!(path = %target.display(), error = %e, "could not preserve metadata");
            self.errors.push(OperationError::from_fs(
                target.to_path_buf(),
                "preserve metadata",
                &e,
            ));
        }
    }

    async fn remove_source_dir(&mut self, entry: &FileSystemEntry) -> Result<(), Halt> {
        loop {
            self.check_cancelled()?;
            let path = entry.path.clone();
            match run_blocking(move || fs::remove_dir(&path).map_err(|e| FsError::io(&path, e)))
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => {
                    let error =
                        OperationError::from_fs(entry.path.clone(), "remove source directory", &e);
                    self.retry_or_cancel(error).await?;
                }
            }
        }
    }

    async fn retry_or_cancel(&mut self, error: OperationError) -> Result<(), Halt> {
        tracing::warn!(path = %error.path.display(), error = %error.message, "transfer item failed");
        match self.observer.on_transfer_error(&error).await {
            TransferErrorAction::Retry => {
                tracing::debug!(path = %error.path.display(), "retrying");
                Ok(())
            }
            TransferErrorAction::Cancel => {
                self.failed += 1;
                self.errors.push(error);
                Err(Halt::Cancelled)
            }
        }
    }

    async fn record_success(&mut self, entry: &FileSystemEntry, target: &Path, report: CopyReport) {
        tracing::debug!(
            source = %entry.path.display(),
            dest = %target.display(),
            bytes = report.bytes,
            "item transferred"
        );
        if let Some(e) = report.metadata_error {
            tracing::warn!(path = %target.display(), error = %e, "could not preserve metadata");
            self.errors.push(OperationError::from_fs(
                target.to_path_buf(),
                "preserve metadata",
                &e,
            ));
        }
        self.succeeded += 1;
        self.complete(entry, 1, entry.size).await;
    }

    async fn skip(&mut self, entry: &FileSystemEntry) {
        self.skipped += 1;
        let (items, bytes) = self.passed_over(entry).await;
        self.complete(entry, items, bytes).await;
    }

    async fn reject(&mut self, entry: &FileSystemEntry, reason: String) {
        tracing::warn!(path = %entry.path.display(), %reason, "refusing transfer");
        self.failed += 1;
        self.errors.push(OperationError::new(entry.path.clone(), reason));
        let (items, bytes) = self.passed_over(entry).await;
        self.complete(entry, items, bytes).await;
    }

    /// Items and bytes an untransferred entry stands for in the totals.
    ///
    /// Precomputed totals already hold a directory's whole subtree, so the
    /// subtree is credited along with the directory.
    async fn passed_over(&mut self, entry: &FileSystemEntry) -> (usize, u64) {
        if !entry.is_dir() || !self.engine.config.precompute_totals {
            return (1, entry.size);
        }
        let roots = vec![entry.clone()];
        run_blocking(move || Ok(measure(&roots)))
            .await
            .unwrap_or((1, 0))
    }

    async fn complete(&mut self, entry: &FileSystemEntry, items: usize, bytes: u64) {
        self.progress.complete_items(items, bytes);
        self.progress
            .set_current(entry.name.clone(), entry.path.clone());
        self.observer.on_progress(&self.progress).await;
    }

    fn finish(self, result: Result<bool, Halt>) -> OperationComplete {
        let outcome = match result {
            Err(halt) => {
                tracing::info!(?halt, "transfer stopped early");
                Outcome::Cancelled
            }
            Ok(_) if self.errors.is_empty() => Outcome::Completed,
            Ok(_) => Outcome::CompletedWithErrors,
        };

        tracing::info!(
            %outcome,
            succeeded = self.succeeded,
            skipped = self.skipped,
            failed = self.failed,
            bytes = self.progress.bytes_processed,
            "transfer finished"
        );

        OperationComplete {
            operation_type: self.progress.operation_type,
            outcome,
            succeeded: self.succeeded,
            skipped: self.skipped,
            failed: self.failed,
            bytes_processed: self.progress.bytes_processed,
            errors: self.errors,
        }
    }
}

/// Ensure the destination is a directory, creating it if missing, and
/// return its canonical form.
fn prepare_destination(destination: &Path) -> Result<PathBuf, FsError> {
    if !destination.is_dir() {
        if fs::symlink_metadata(destination).is_ok() {
            return Err(FsError::NotADirectory {
                path: destination.to_path_buf(),
            });
        }
        fs::create_dir_all(destination).map_err(|e| FsError::io(destination, e))?;
        tracing::debug!(path = %destination.display(), "created destination directory");
    }
    fs::canonicalize(destination).map_err(|e| FsError::io(destination, e))
}

/// Why a top-level source cannot go into `dest_root`, if it cannot.
fn self_transfer_reason(
    source: &Path,
    is_dir: bool,
    dest_root: &Path,
    verb: &str,
) -> Option<String> {
    if source.file_name().is_none() {
        return Some(format!("Cannot {verb} a filesystem root"));
    }
    let parent = fs::canonicalize(source.parent()?).ok()?;
    if parent == dest_root {
        return Some("Source and destination are the same".to_string());
    }
    if is_dir {
        let resolved = fs::canonicalize(source).ok()?;
        if dest_root.starts_with(&resolved) {
            return Some(format!("Cannot {verb} a directory into itself"));
        }
    }
    None
}

/// Remove what a failed attempt left at `target` before trying again.
fn discard_leftover(target: &Path) -> Result<(), FsError> {
    if fs::symlink_metadata(target).is_err() {
        return Ok(());
    }
    tracing::debug!(path = %target.display(), "discarding partial output");
    remove_path(target)
}

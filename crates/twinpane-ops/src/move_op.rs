//! Blocking move primitive.

use std::fs;
use std::path::Path;

use tokio_util::sync::CancellationToken;
use twinpane_core::{EngineConfig, FileSystemEntry, FsError};

use crate::copy::{CopyReport, copy_entry};
use crate::delete::remove_file_or_link;

/// Move one file or link to `dest`.
///
/// A same-volume rename keeps all metadata as is. Across volumes the item is
/// copied (metadata applied as for a copy) and the source removed afterwards.
pub(crate) fn move_entry(
    entry: &FileSystemEntry,
    dest: &Path,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<CopyReport, FsError> {
    let error = match fs::rename(&entry.path, dest) {
        Ok(()) => {
            return Ok(CopyReport {
                bytes: entry.size,
                metadata_error: None,
            });
        }
        Err(e) => FsError::io(&entry.path, e),
    };

    if !error.is_cross_device() {
        return Err(error);
    }

    tracing::debug!(
        source = %entry.path.display(),
        dest = %dest.display(),
        "rename crosses devices, copying instead"
    );
    copy_then_remove(entry, dest, config, cancel)
}

/// Copy an item with its metadata, then remove the source. The source is
/// only touched once the copy has fully arrived.
pub(crate) fn copy_then_remove(
    entry: &FileSystemEntry,
    dest: &Path,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<CopyReport, FsError> {
    let report = copy_entry(entry, dest, config, cancel)?;
    remove_file_or_link(&entry.path)?;
    Ok(report)
}

//! Recycle bin facility.

use std::path::Path;

use twinpane_core::FsError;

/// Reversible deletion, used both as a deletion mode and to get replaced
/// destination items out of the way.
pub trait RecycleBin: Send + Sync {
    /// Move `path` (file or whole directory tree) to the recycle bin.
    fn move_to_recycle_bin(&self, path: &Path) -> Result<(), FsError>;
}

/// The platform recycle bin / trash, via the `trash` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRecycleBin;

impl RecycleBin for SystemRecycleBin {
    fn move_to_recycle_bin(&self, path: &Path) -> Result<(), FsError> {
        trash::delete(path).map_err(|e| FsError::RecycleBin {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "moved to recycle bin");
        Ok(())
    }
}

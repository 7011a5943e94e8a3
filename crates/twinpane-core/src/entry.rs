//! Filesystem entries participating in a transfer or deletion.

use std::ffi::OsStr;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::{FileAttributes, FsError};

/// File metadata timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Last modification (last write) time.
    pub modified: SystemTime,
    /// Last access time (if available).
    pub accessed: Option<SystemTime>,
    /// Creation time (if available, platform-dependent).
    pub created: Option<SystemTime>,
}

impl Timestamps {
    /// Create timestamps with only modified time.
    pub fn with_modified(modified: SystemTime) -> Self {
        Self {
            modified,
            accessed: None,
            created: None,
        }
    }

    /// Read whatever timestamps the platform exposes.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            accessed: metadata.accessed().ok(),
            created: metadata.created().ok(),
        }
    }
}

/// Type of filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file (or anything else that is neither a directory nor a link).
    File,
    /// Directory.
    Directory,
    /// Symbolic link, never followed.
    Symlink {
        /// Link target as stored in the link.
        target: PathBuf,
    },
}

/// A single file or directory to operate on.
///
/// Entries are snapshots taken right before an item is processed and are
/// never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSystemEntry {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// File name (last path component).
    pub name: CompactString,
    /// Entry type.
    pub kind: EntryKind,
    /// Size in bytes; 0 for directories and links.
    pub size: u64,
    /// Timestamps used for newer-than comparisons and preserved on copy.
    pub timestamps: Timestamps,
    /// Platform attribute bits, preserved on copy.
    pub attributes: FileAttributes,
    /// Unix permission bits, when the platform has them.
    pub mode: Option<u32>,
}

impl FileSystemEntry {
    /// Stat a path without following symbolic links.
    pub fn stat(path: impl Into<PathBuf>) -> Result<Self, FsError> {
        let path = path.into();
        let metadata = fs::symlink_metadata(&path).map_err(|e| FsError::io(&path, e))?;

        let mut entry = Self::from_metadata(path, &metadata);
        if metadata.file_type().is_symlink() {
            let target = fs::read_link(&entry.path).map_err(|e| FsError::io(&entry.path, e))?;
            entry.kind = EntryKind::Symlink { target };
        }
        Ok(entry)
    }

    /// Stat a path, returning `None` if it no longer exists or cannot be read.
    pub fn try_stat(path: impl Into<PathBuf>) -> Option<Self> {
        Self::stat(path).ok()
    }

    /// Build an entry from metadata that was already fetched.
    ///
    /// Symbolic links are reported with an empty target; use [`Self::stat`]
    /// to resolve it.
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let name: CompactString = path
            .file_name()
            .map(|n| CompactString::from(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::from(path.to_string_lossy()));

        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink {
                target: PathBuf::new(),
            }
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };

        let size = if kind == EntryKind::File {
            metadata.len()
        } else {
            0
        };

        Self {
            attributes: FileAttributes::from_metadata(&name, metadata),
            mode: unix_mode(metadata),
            timestamps: Timestamps::from_metadata(metadata),
            path,
            name,
            kind,
            size,
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Check if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, EntryKind::Symlink { .. })
    }

    /// The last path component, as the OS sees it.
    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }

    /// The path of this entry.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether this entry was written strictly later than `other`.
    pub fn is_newer_than(&self, other: &FileSystemEntry) -> bool {
        self.timestamps.modified > other.timestamps.modified
    }
}

#[cfg(unix)]
fn unix_mode(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;

    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &Metadata) -> Option<u32> {
    None
}

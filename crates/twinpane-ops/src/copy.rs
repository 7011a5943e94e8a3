//! Blocking copy primitives and metadata preservation.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use filetime::FileTime;
use tokio_util::sync::CancellationToken;
use twinpane_core::{EngineConfig, EntryKind, FileSystemEntry, FsError};

/// What a single item transfer produced.
#[derive(Debug)]
pub(crate) struct CopyReport {
    /// Bytes written (or moved).
    pub bytes: u64,
    /// Set when the data arrived but timestamps/attributes could not be applied.
    pub metadata_error: Option<FsError>,
}

/// Run blocking filesystem work off the async runtime.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, FsError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, FsError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| FsError::Other {
            message: format!("Task failed: {e}"),
        })?
}

/// Copy one file or link to `dest`, which must not exist yet.
pub(crate) fn copy_entry(
    entry: &FileSystemEntry,
    dest: &Path,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<CopyReport, FsError> {
    let bytes = match &entry.kind {
        EntryKind::File => copy_file_contents(&entry.path, dest, config.chunk_size, cancel)?,
        EntryKind::Symlink { target } => {
            copy_symlink(target, &entry.path, dest)?;
            0
        }
        EntryKind::Directory => {
            return Err(FsError::Other {
                message: format!("{} is a directory", entry.path.display()),
            });
        }
    };

    let metadata_error = apply_metadata(entry, dest, config).err();
    Ok(CopyReport {
        bytes,
        metadata_error,
    })
}

/// Stream `source` into a freshly created `dest` in `chunk_size` pieces.
///
/// Cancellation is checked before every chunk. A cancelled or failed copy
/// leaves the partial destination file behind.
pub(crate) fn copy_file_contents(
    source: &Path,
    dest: &Path,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<u64, FsError> {
    let mut reader = fs::File::open(source).map_err(|e| FsError::io(source, e))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| FsError::io(dest, e))?;

    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut copied = 0u64;

    loop {
        if cancel.is_cancelled() {
            return Err(FsError::Cancelled);
        }

        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsError::io(source, e)),
        };

        writer
            .write_all(&buffer[..read])
            .map_err(|e| FsError::io(dest, e))?;
        copied += read as u64;
    }

    writer.flush().map_err(|e| FsError::io(dest, e))?;
    Ok(copied)
}

/// Recreate a symbolic link pointing at the same target.
#[cfg(unix)]
fn copy_symlink(target: &Path, _source: &Path, dest: &Path) -> Result<(), FsError> {
    std::os::unix::fs::symlink(target, dest).map_err(|e| FsError::io(dest, e))
}

/// Recreate a symbolic link pointing at the same target.
#[cfg(windows)]
fn copy_symlink(target: &Path, source: &Path, dest: &Path) -> Result<(), FsError> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    let result = if source.is_dir() {
        symlink_dir(target, dest)
    } else {
        symlink_file(target, dest)
    };
    result.map_err(|e| FsError::io(dest, e))
}

#[cfg(not(any(unix, windows)))]
fn copy_symlink(_target: &Path, source: &Path, _dest: &Path) -> Result<(), FsError> {
    Err(FsError::Other {
        message: format!("Cannot copy symbolic link {}", source.display()),
    })
}

/// Give `dest` the timestamps and attributes recorded in `entry`.
///
/// Timestamps go first: a read-only attribute can get in the way of later
/// writes on some platforms.
pub(crate) fn apply_metadata(
    entry: &FileSystemEntry,
    dest: &Path,
    config: &EngineConfig,
) -> Result<(), FsError> {
    let modified = FileTime::from_system_time(entry.timestamps.modified);
    let accessed = entry
        .timestamps
        .accessed
        .map(FileTime::from_system_time)
        .unwrap_or(modified);

    if entry.is_symlink() {
        if config.preserve_timestamps {
            filetime::set_symlink_file_times(dest, accessed, modified)
                .map_err(|e| FsError::io(dest, e))?;
        }
        return Ok(());
    }

    if config.preserve_timestamps {
        filetime::set_file_times(dest, accessed, modified).map_err(|e| FsError::io(dest, e))?;
        #[cfg(windows)]
        if let Some(created) = entry.timestamps.created {
            set_creation_time(dest, created)?;
        }
    }

    if config.preserve_attributes {
        set_attributes(entry, dest)?;
    }

    Ok(())
}

#[cfg(windows)]
fn set_creation_time(path: &Path, created: std::time::SystemTime) -> Result<(), FsError> {
    use std::os::windows::fs::{FileTimesExt, OpenOptionsExt};
    use windows_sys::Win32::Storage::FileSystem::{FILE_FLAG_BACKUP_SEMANTICS, FILE_WRITE_ATTRIBUTES};

    // Backup semantics lets the same call open directories.
    let file = OpenOptions::new()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .custom_flags(FILE_FLAG_BACKUP_SEMANTICS)
        .open(path)
        .map_err(|e| FsError::io(path, e))?;
    file.set_times(fs::FileTimes::new().set_created(created))
        .map_err(|e| FsError::io(path, e))
}

#[cfg(unix)]
fn set_attributes(entry: &FileSystemEntry, dest: &Path) -> Result<(), FsError> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = entry.mode {
        fs::set_permissions(dest, fs::Permissions::from_mode(mode))
            .map_err(|e| FsError::io(dest, e))?;
    }
    Ok(())
}

#[cfg(windows)]
fn set_attributes(entry: &FileSystemEntry, dest: &Path) -> Result<(), FsError> {
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{FILE_ATTRIBUTE_NORMAL, SetFileAttributesW};

    let wide: Vec<u16> = dest
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();
    let bits = match entry.attributes.settable().bits() {
        0 => FILE_ATTRIBUTE_NORMAL,
        bits => bits,
    };

    // SAFETY: `wide` is a NUL-terminated UTF-16 path that outlives the call.
    let ok = unsafe { SetFileAttributesW(wide.as_ptr(), bits) };
    if ok == 0 {
        return Err(FsError::io(dest, std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn set_attributes(_entry: &FileSystemEntry, _dest: &Path) -> Result<(), FsError> {
    Ok(())
}

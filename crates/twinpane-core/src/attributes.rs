//! Platform file attribute bits.

use std::fs::Metadata;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// File attribute set, using the Windows attribute bit values.
    ///
    /// On Windows this is the native attribute word. Elsewhere it is derived
    /// from the metadata and the file name.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FileAttributes: u32 {
        const READONLY = 0x0001;
        const HIDDEN = 0x0002;
        const SYSTEM = 0x0004;
        const DIRECTORY = 0x0010;
        const ARCHIVE = 0x0020;
    }
}

impl FileAttributes {
    /// Read the attribute set for an entry.
    #[cfg(windows)]
    pub fn from_metadata(_name: &str, metadata: &Metadata) -> Self {
        use std::os::windows::fs::MetadataExt;

        Self::from_bits_truncate(metadata.file_attributes())
    }

    /// Read the attribute set for an entry.
    #[cfg(not(windows))]
    pub fn from_metadata(name: &str, metadata: &Metadata) -> Self {
        let mut attributes = Self::empty();
        if metadata.permissions().readonly() {
            attributes |= Self::READONLY;
        }
        if name.starts_with('.') && name != "." && name != ".." {
            attributes |= Self::HIDDEN;
        }
        if metadata.is_dir() {
            attributes |= Self::DIRECTORY;
        }
        attributes
    }

    /// The bits that can be written back to a file; `DIRECTORY` is derived
    /// from the file type and never set explicitly.
    pub fn settable(self) -> Self {
        self - Self::DIRECTORY
    }
}

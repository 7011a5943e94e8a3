//! Core types for twinpane.
//!
//! This crate provides the data model shared by the transfer and deletion
//! engines: filesystem entries, attribute sets, errors, and engine
//! configuration.

mod attributes;
mod config;
mod entry;
mod error;

pub use attributes::FileAttributes;
pub use config::{DEFAULT_CHUNK_SIZE, EngineConfig, EngineConfigBuilder};
pub use entry::{EntryKind, FileSystemEntry, Timestamps};
pub use error::FsError;

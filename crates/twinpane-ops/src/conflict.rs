//! Conflict detection and resolution for transfers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use twinpane_core::{FileSystemEntry, FsError};

use crate::OperationObserver;

/// The kind of conflict encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A file (or link) already exists at the destination.
    FileExists,
    /// A directory already exists at the destination.
    DirectoryExists,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileExists => write!(f, "File already exists"),
            Self::DirectoryExists => write!(f, "Directory already exists"),
        }
    }
}

/// A collision between an incoming item and an existing destination item.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// The item being transferred.
    pub source: FileSystemEntry,
    /// The item already sitting at the destination path.
    pub destination: FileSystemEntry,
    /// The kind of conflict.
    pub kind: ConflictKind,
    /// A free name in the destination directory, offered as the rename default.
    pub suggested_name: String,
    /// Whether "overwrite if newer" is worth offering (the write times differ).
    pub allow_overwrite_if_newer: bool,
}

impl Conflict {
    /// Describe a collision; the destination directory is searched for a free
    /// rename suggestion.
    pub fn new(source: FileSystemEntry, destination: FileSystemEntry) -> Self {
        let kind = if destination.is_dir() {
            ConflictKind::DirectoryExists
        } else {
            ConflictKind::FileExists
        };
        let suggested_name = suggest_rename_path(&destination.path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let allow_overwrite_if_newer =
            source.timestamps.modified != destination.timestamps.modified;

        Self {
            source,
            destination,
            kind,
            suggested_name,
            allow_overwrite_if_newer,
        }
    }
}

/// How to resolve a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictDecision {
    /// Abort the entire operation.
    Abort,
    /// Leave the destination untouched.
    Skip,
    /// Replace the destination (directories are merged).
    Overwrite,
    /// Replace only if the source was written later than the destination.
    OverwriteIfNewer,
    /// Place the incoming item under another name.
    Rename(String),
}

/// A decision together with the "apply to all" toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResponse {
    /// The chosen resolution.
    pub decision: ConflictDecision,
    /// Reuse the decision for every later conflict of the same run.
    pub apply_to_all: bool,
}

impl ConflictResponse {
    /// A decision for this conflict only.
    pub fn once(decision: ConflictDecision) -> Self {
        Self {
            decision,
            apply_to_all: false,
        }
    }

    /// A decision for this and every later conflict.
    pub fn for_all(decision: ConflictDecision) -> Self {
        Self {
            decision,
            apply_to_all: true,
        }
    }

    /// The answer used when nobody is left to ask.
    pub fn abort() -> Self {
        Self::once(ConflictDecision::Abort)
    }
}

/// Per-run conflict state.
///
/// Starts without a cached decision and asks the observer for each conflict.
/// The first answer flagged "apply to all" is cached and from then on every
/// conflict is answered from the cache without prompting. The cache is never
/// cleared within a run.
#[derive(Debug, Default)]
pub struct ConflictResolver {
    cached: Option<ConflictDecision>,
}

impl ConflictResolver {
    /// Create a resolver that prompts for every conflict.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver that behaves as if `decision` had been applied to all.
    pub fn with_default(decision: Option<ConflictDecision>) -> Self {
        Self {
            cached: decision,
        }
    }

    /// The cached "apply to all" decision, if any.
    pub fn cached(&self) -> Option<&ConflictDecision> {
        self.cached.as_ref()
    }

    /// Produce a decision for `conflict`, prompting only if nothing is cached.
    ///
    /// A cached rename gets the conflict's own suggested name so that later
    /// collisions do not all land on one name. Invalid rename answers are
    /// asked again.
    pub async fn resolve<O: OperationObserver>(
        &mut self,
        conflict: &Conflict,
        observer: &mut O,
    ) -> ConflictDecision {
        if let Some(cached) = &self.cached {
            return match cached {
                ConflictDecision::Rename(_) => {
                    ConflictDecision::Rename(conflict.suggested_name.clone())
                }
                other => other.clone(),
            };
        }

        loop {
            let response = observer.on_conflict(conflict).await;

            if let ConflictDecision::Rename(name) = &response.decision {
                if let Err(e) = validate_new_name(name, &conflict.destination.name) {
                    tracing::debug!(
                        path = %conflict.destination.path.display(),
                        error = %e,
                        "rejected rename answer, asking again"
                    );
                    continue;
                }
            }

            if response.apply_to_all && response.decision != ConflictDecision::Abort {
                self.cached = Some(response.decision.clone());
            }
            return response.decision;
        }
    }
}

/// Generate a renamed path that does not exist yet.
///
/// For "file.txt", tries "file (1).txt", "file (2).txt", etc.
pub fn suggest_rename_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .filter(|e| !e.is_empty())
        .map(|e| e.to_string_lossy().into_owned());

    let with_suffix = |suffix: &str| match &extension {
        Some(ext) => format!("{stem}{suffix}.{ext}"),
        None => format!("{stem}{suffix}"),
    };

    for i in 1..1000 {
        let candidate = parent.join(with_suffix(&format!(" ({i})")));
        if !candidate.exists() {
            return candidate;
        }
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    parent.join(with_suffix(&format!("_{timestamp}")))
}

/// Check that `name` can replace `current` as a single path component.
pub fn validate_new_name(name: &str, current: &str) -> Result<(), FsError> {
    if name.is_empty() {
        return Err(FsError::invalid_name(name, "Name cannot be empty"));
    }

    if name.len() > 255 {
        return Err(FsError::invalid_name(name, "Name is too long (max 255 characters)"));
    }

    if name == "." || name == ".." {
        return Err(FsError::invalid_name(name, "Name cannot be '.' or '..'"));
    }

    let mut invalid_chars = vec!['/', '\0'];
    if cfg!(windows) {
        invalid_chars.extend(['\\', ':', '*', '?', '"', '<', '>', '|']);
    }
    if let Some(c) = invalid_chars.into_iter().find(|c| name.contains(*c)) {
        return Err(FsError::invalid_name(name, format!("Name cannot contain '{c}'")));
    }

    if name.starts_with(' ') || name.ends_with(' ') {
        return Err(FsError::invalid_name(
            name,
            "Name cannot start or end with spaces",
        ));
    }

    if name.ends_with('.') {
        return Err(FsError::invalid_name(name, "Name cannot end with a dot"));
    }

    let same = if cfg!(windows) {
        name.eq_ignore_ascii_case(current)
    } else {
        name == current
    };
    if same {
        return Err(FsError::invalid_name(name, "Name is the one already taken"));
    }

    Ok(())
}

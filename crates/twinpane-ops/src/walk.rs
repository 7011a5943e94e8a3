//! Tree enumeration shared by the engines.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use twinpane_core::FileSystemEntry;

/// Stat the requested top-level paths. Paths that no longer exist are dropped.
///
/// A path without a final name (`dir/..`, `.`) is resolved to the directory
/// it refers to, so every root that still has a parent carries its real name.
pub(crate) fn stat_roots(paths: Vec<PathBuf>) -> Vec<FileSystemEntry> {
    paths
        .into_iter()
        .map(name_root)
        .filter_map(|path| match FileSystemEntry::stat(&path) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "dropping missing source");
                None
            }
        })
        .collect()
}

fn name_root(path: PathBuf) -> PathBuf {
    if path.file_name().is_some() {
        return path;
    }
    match fs::canonicalize(&path) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot resolve source");
            path
        }
    }
}

/// A directory's immediate children.
#[derive(Debug, Default)]
pub(crate) struct Listing {
    pub entries: Vec<FileSystemEntry>,
    /// False if the directory or one of its children could not be read.
    pub complete: bool,
}

/// List the immediate children of `dir`, never following links.
pub(crate) fn list_dir(dir: &Path) -> Listing {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "cannot list directory");
            return Listing::default();
        }
    };

    let mut listing = Listing {
        entries: Vec::new(),
        complete: true,
    };
    for child in read_dir {
        match child.map(|c| c.path()) {
            Ok(path) => match FileSystemEntry::stat(&path) {
                Ok(entry) => listing.entries.push(entry),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "cannot stat entry");
                    listing.complete = false;
                }
            },
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "cannot read directory entry");
                listing.complete = false;
            }
        }
    }
    listing
}

/// Breadth-first collection of everything under `roots`.
///
/// Returns files (and links) in discovery order, and directories in
/// discovery order. Every directory appears before its descendants.
pub(crate) fn collect_tree(
    roots: Vec<FileSystemEntry>,
) -> (Vec<FileSystemEntry>, Vec<FileSystemEntry>) {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let mut pending = VecDeque::new();

    for root in roots {
        if root.is_dir() {
            pending.push_back(root);
        } else {
            files.push(root);
        }
    }

    while let Some(dir) = pending.pop_front() {
        let listing = list_dir(&dir.path);
        dirs.push(dir);
        for child in listing.entries {
            if child.is_dir() {
                pending.push_back(child);
            } else {
                files.push(child);
            }
        }
    }

    (files, dirs)
}

/// Count every item and file byte under `roots` up front.
pub(crate) fn measure(roots: &[FileSystemEntry]) -> (usize, u64) {
    let mut items = 0usize;
    let mut bytes = 0u64;

    for root in roots {
        items += 1;
        bytes += root.size;
        if !root.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&root.path)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(root = %root.path.display(), error = %e, "walk error");
                    continue;
                }
            };
            items += 1;
            if entry.file_type().is_file() {
                if let Ok(metadata) = entry.metadata() {
                    bytes += metadata.len();
                }
            }
        }
    }

    (items, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("a.txt"), b"12345").unwrap();
        fs::write(root.join("sub/b.txt"), b"123").unwrap();
        fs::write(root.join("sub/deeper/c.txt"), b"1").unwrap();
        dir
    }

    #[test]
    fn test_stat_roots_drops_missing() {
        let dir = tree();
        let roots = stat_roots(vec![dir.path().join("root"), dir.path().join("gone")]);
        assert_eq!(roots.len(), 1);
        assert!(roots[0].is_dir());
    }

    #[test]
    fn test_stat_roots_resolves_parent_references() {
        let dir = tree();
        let root = dir.path().join("root");
        let roots = stat_roots(vec![root.join("sub/..")]);

        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].path, fs::canonicalize(&root).unwrap());
        assert_eq!(roots[0].name, "root");
    }

    #[test]
    fn test_list_dir() {
        let dir = tree();
        let listing = list_dir(&dir.path().join("root"));
        assert!(listing.complete);
        assert_eq!(listing.entries.len(), 2);

        let missing = list_dir(&dir.path().join("gone"));
        assert!(!missing.complete);
        assert!(missing.entries.is_empty());
    }

    #[test]
    fn test_collect_tree_orders_parents_first() {
        let dir = tree();
        let root = dir.path().join("root");
        let (files, dirs) = collect_tree(stat_roots(vec![root.clone()]));

        assert_eq!(files.len(), 3);
        let dir_paths: Vec<_> = dirs.iter().map(|d| d.path.clone()).collect();
        assert_eq!(
            dir_paths,
            vec![root.clone(), root.join("sub"), root.join("sub/deeper")]
        );
    }

    #[test]
    fn test_measure() {
        let dir = tree();
        let roots = stat_roots(vec![dir.path().join("root")]);
        // root, a.txt, sub, b.txt, deeper, c.txt
        assert_eq!(measure(&roots), (6, 9));
    }
}

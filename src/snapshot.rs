//! Whole-tree snapshots and change classification
//!
//! A [`Snapshot`] maps every file's absolute path to its full content. There
//! is no hashing and no line-level diffing: two versions of a file differ
//! exactly when their strings differ.
//!
//! Snapshots are built only through the filesystem's path-based API
//! ([`FileSystem::all_file_paths`] and [`FileSystem::cat`]), so nothing here
//! holds references into the live tree.
//!
//! ## Examples
//!
//! ```rust
//! use termfs::snapshot::{self, Snapshot};
//! use termfs::types::ChangeKind;
//!
//! let mut before = Snapshot::new();
//! before.insert("/a".to_string(), "one".to_string());
//! let mut after = before.clone();
//! after.insert("/a".to_string(), "two".to_string());
//! after.insert("/b".to_string(), String::new());
//!
//! assert_eq!(snapshot::classify_path("/a", &after, &before), Some(ChangeKind::Modified));
//! assert_eq!(snapshot::changed_paths(&after, &before).len(), 2);
//! ```

use crate::filesystem::FileSystem;
use crate::types::{ChangeKind, DiffEntry};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Full path-to-content map of the files in a tree
pub type Snapshot = BTreeMap<String, String>;

/// Capture the current content of every file
pub fn capture(fs: &FileSystem) -> Snapshot {
    let snapshot: Snapshot = fs
        .all_file_paths()
        .into_iter()
        .filter_map(|path| fs.cat(&path).ok().map(|content| (path, content)))
        .collect();
    trace!("Captured snapshot of {} files", snapshot.len());
    snapshot
}

/// Classify one path's content now against before
///
/// Returns `None` when the path exists in neither.
pub fn classify(current: Option<&str>, previous: Option<&str>) -> Option<ChangeKind> {
    match (current, previous) {
        (Some(_), None) => Some(ChangeKind::Added),
        (None, Some(_)) => Some(ChangeKind::Deleted),
        (Some(now), Some(before)) if now == before => Some(ChangeKind::Unchanged),
        (Some(_), Some(_)) => Some(ChangeKind::Modified),
        (None, None) => None,
    }
}

/// [`classify`] for a path looked up in two snapshots
pub fn classify_path(path: &str, current: &Snapshot, previous: &Snapshot) -> Option<ChangeKind> {
    classify(
        current.get(path).map(String::as_str),
        previous.get(path).map(String::as_str),
    )
}

/// Every path whose content differs between the two snapshots
pub fn changed_paths(current: &Snapshot, previous: &Snapshot) -> BTreeSet<String> {
    current
        .keys()
        .chain(previous.keys())
        .filter(|path| {
            !matches!(
                classify_path(path, current, previous),
                Some(ChangeKind::Unchanged) | None
            )
        })
        .cloned()
        .collect()
}

/// Whole-content diff for one path, `None` if it did not change
pub fn diff_entry(path: &str, current: &Snapshot, previous: &Snapshot) -> Option<DiffEntry> {
    let change = classify_path(path, current, previous)?;
    if change == ChangeKind::Unchanged {
        return None;
    }
    Some(DiffEntry {
        path: path.to_string(),
        change,
        old_content: previous.get(path).cloned(),
        new_content: current.get(path).cloned(),
    })
}

/// Diff entries for every changed path, in path order
pub fn diff(current: &Snapshot, previous: &Snapshot) -> Vec<DiffEntry> {
    changed_paths(current, previous)
        .iter()
        .filter_map(|path| diff_entry(path, current, previous))
        .collect()
}

/// `base` with `paths` taken from `current`
///
/// A path present in `current` replaces its entry; a path absent from
/// `current` is deleted.
pub fn overlay<'a, I>(base: &Snapshot, current: &Snapshot, paths: I) -> Snapshot
where
    I: IntoIterator<Item = &'a String>,
{
    let mut result = base.clone();
    for path in paths {
        match current.get(path) {
            Some(content) => {
                result.insert(path.clone(), content.clone());
            }
            None => {
                result.remove(path);
            }
        }
    }
    result
}

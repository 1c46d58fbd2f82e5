//! Append-only commit graph
//!
//! Commits are stored in creation order; each names its parent by hash.
//! Branches live outside the graph as plain name-to-hash pointers, so the
//! graph itself only answers lookup and ancestry questions.
//!
//! ## Structure
//!
//! ```text
//! a1b2c3d (root)
//! └── 4e5f6a7
//!     ├── 8b9c0d1   <- main
//!     └── 2e3f4a5
//!         └── 6b7c8d9   <- feature
//! ```
//!
//! Hash lookups return the earliest matching commit, which keeps lookups
//! deterministic even if two short hashes ever collide.

use crate::commit::Commit;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{trace, warn};

/// Ordered list of every commit ever created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitGraph {
    commits: Vec<Commit>,
}

impl CommitGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commit
    pub fn push(&mut self, commit: Commit) {
        trace!("Adding commit {} to graph", commit.hash);
        self.commits.push(commit);
    }

    /// Commit with exactly this hash
    pub fn get(&self, hash: &str) -> Option<&Commit> {
        self.commits.iter().find(|c| c.hash == hash)
    }

    /// Whether a commit with this hash exists
    pub fn contains(&self, hash: &str) -> bool {
        self.get(hash).is_some()
    }

    /// First commit whose hash starts with `prefix`
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&Commit> {
        if prefix.is_empty() {
            return None;
        }
        self.commits.iter().find(|c| c.hash.starts_with(prefix))
    }

    /// Walk from `head` through parent links, newest first
    pub fn ancestry<'a>(&'a self, head: Option<&'a str>) -> Ancestry<'a> {
        Ancestry {
            graph: self,
            next: head,
            visited: HashSet::new(),
        }
    }

    /// Whether `ancestor` is `descendant` or lies on its parent chain
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        self.ancestry(Some(descendant)).any(|c| c.hash == ancestor)
    }

    /// Number of commits
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether the graph has no commits
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// All commits in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Commit> {
        self.commits.iter()
    }
}

/// Iterator over a commit and its ancestors
///
/// Stops at a root commit, at a dangling parent hash, or on revisiting a
/// commit (only possible with hand-edited state).
pub struct Ancestry<'a> {
    graph: &'a CommitGraph,
    next: Option<&'a str>,
    visited: HashSet<&'a str>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a Commit;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.next.take()?;
        if !self.visited.insert(hash) {
            warn!("Commit graph cycle detected at {}", hash);
            return None;
        }
        let commit = self.graph.get(hash)?;
        self.next = commit.parent_hash.as_deref();
        Some(commit)
    }
}

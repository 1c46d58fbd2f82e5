//! Core data types used throughout the termfs library
//!
//! This module contains the option and result records exchanged across the
//! public filesystem and git APIs.
//!
//! ## Overview
//!
//! - **Configuration**: `WorkspaceConfig` - home directory, user and storage settings
//! - **Options**: `LsOptions`, `RmOptions` - flags for listing and removal
//! - **Filesystem results**: `LsEntry`, `GrepMatch`, `StorageUsage`, `RestoreResult`
//! - **Git results**: `StatusReport`, `LogEntry`, `CommitDetails`, `DiffEntry`,
//!   `BranchInfo`, `CheckoutResult`, `MergeOutcome`
//!
//! ## Examples
//!
//! ```rust
//! use termfs::types::LsOptions;
//!
//! let options = LsOptions {
//!     all: true,
//!     ..Default::default()
//! };
//! assert!(!options.long);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::commit::Commit;
use crate::node::NodeType;
use crate::storage::DEFAULT_QUOTA_BYTES;

/// Configuration shared by the filesystem and the git engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Home directory created with the default contents and used as initial cwd
    pub home_dir: String,
    /// User name written into the default files
    pub user: String,
    /// Prefix of the store keys (`<prefix>.filesystem`, `<prefix>.git`)
    pub key_prefix: String,
    /// Byte quota applied to stores created by the builder (`None` = unlimited)
    pub storage_quota: Option<u64>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            home_dir: "/home/user".to_string(),
            user: "user".to_string(),
            key_prefix: "termfs".to_string(),
            storage_quota: Some(DEFAULT_QUOTA_BYTES),
        }
    }
}

/// Flags for [`crate::FileSystem::ls`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LsOptions {
    /// Include hidden entries (names starting with `.`)
    pub all: bool,
    /// Populate [`LsEntry::details`]
    pub long: bool,
}

/// Flags for [`crate::FileSystem::rm`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RmOptions {
    /// Allow removing non-empty directories
    pub recursive: bool,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LsEntry {
    /// Entry name
    pub name: String,
    /// Absolute path of the entry
    pub path: String,
    /// File or directory
    pub node_type: NodeType,
    /// Size and timestamps, present for long listings
    pub details: Option<EntryDetails>,
}

impl LsEntry {
    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Directory
    }
}

/// Metadata shown by long listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDetails {
    /// Content size in bytes (recursive for directories)
    pub size: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
}

/// A single line matched by [`crate::FileSystem::grep`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrepMatch {
    /// Absolute path of the file
    pub path: String,
    /// 1-indexed line number
    pub line: usize,
    /// Full text of the matching line
    pub content: String,
}

/// Storage consumption reported by [`crate::FileSystem::storage_usage`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageUsage {
    /// Bytes used by every key in the backing store
    pub used_bytes: u64,
    /// Quota of the backing store, if it has one
    pub quota_bytes: Option<u64>,
}

impl StorageUsage {
    /// Used share of the quota, as a percentage (0-100)
    pub fn percentage(&self) -> Option<f64> {
        match self.quota_bytes {
            Some(quota) if quota > 0 => Some(self.used_bytes as f64 / quota as f64 * 100.0),
            _ => None,
        }
    }
}

/// Result of restoring the tree from a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreResult {
    /// Files created or overwritten
    pub files_written: usize,
    /// Previously tracked files removed
    pub files_removed: usize,
    /// Parent directories created along the way
    pub directories_created: usize,
}

/// How a path differs between two states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present now, absent before
    Added,
    /// Present in both with different content
    Modified,
    /// Absent now, present before
    Deleted,
    /// Present in both with identical content
    Unchanged,
}

impl ChangeKind {
    /// Label used by `status` output
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Added => "new file",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Unchanged => "unchanged",
        }
    }
}

/// A path and how it changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Absolute path
    pub path: String,
    /// Classification relative to the last commit
    pub change: ChangeKind,
}

/// Working-tree status relative to the last commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Current branch name
    pub branch: String,
    /// Staged paths, including staged paths whose content is unchanged
    pub staged: Vec<StatusEntry>,
    /// Tracked paths modified or deleted but not staged
    pub unstaged: Vec<StatusEntry>,
    /// Files never committed and not staged
    pub untracked: Vec<String>,
}

impl StatusReport {
    /// Staged entries that would actually change the next commit
    pub fn staged_changes(&self) -> impl Iterator<Item = &StatusEntry> {
        self.staged.iter().filter(|e| e.change != ChangeKind::Unchanged)
    }

    /// Whether any staged or unstaged change exists (untracked files do not count)
    pub fn has_changes(&self) -> bool {
        self.staged_changes().next().is_some() || !self.unstaged.is_empty()
    }

    /// Number of staged and unstaged changes
    pub fn change_count(&self) -> usize {
        self.staged_changes().count() + self.unstaged.len()
    }

    /// Whether nothing at all differs, untracked files included
    pub fn is_clean(&self) -> bool {
        !self.has_changes() && self.untracked.is_empty()
    }
}

/// One entry of `git log`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Short commit hash
    pub hash: String,
    /// Commit message
    pub message: String,
    /// Commit time
    pub timestamp: DateTime<Utc>,
    /// Parent hash, `None` for a root commit
    pub parent_hash: Option<String>,
    /// Branches whose head is this commit
    pub branches: Vec<String>,
}

/// Whole-content difference for one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Absolute path
    pub path: String,
    /// Added, modified or deleted
    pub change: ChangeKind,
    /// Content before the change
    pub old_content: Option<String>,
    /// Content after the change
    pub new_content: Option<String>,
}

/// A commit together with its changes against its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetails {
    /// The commit itself
    pub commit: Commit,
    /// Branches whose head is this commit
    pub branches: Vec<String>,
    /// Whole-content changes against the parent snapshot
    pub changes: Vec<DiffEntry>,
}

/// Branch listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Branch name
    pub name: String,
    /// Head commit, `None` for an unborn branch
    pub head: Option<String>,
    /// Whether this is the current branch
    pub is_current: bool,
}

/// Result of a checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    /// Branch that is current after the checkout
    pub branch: String,
    /// Commit whose snapshot is now in the tree, `None` for an unborn branch
    pub commit: Option<String>,
    /// True when a commit prefix rather than a branch was checked out
    pub detached: bool,
    /// Tree changes applied
    pub restore: RestoreResult,
}

/// Result of a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeOutcome {
    /// Current branch already contains the source head
    AlreadyUpToDate,
    /// Current branch pointer moved forward to the source head
    FastForward {
        /// Previous head of the current branch
        from: Option<String>,
        /// New head of the current branch
        to: String,
        /// Tree changes applied
        restore: RestoreResult,
    },
}

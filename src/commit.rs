//! Commit records
//!
//! A [`Commit`] is an immutable record of a full snapshot plus a message,
//! a timestamp and an optional parent hash. Commits are only ever created by
//! [`crate::GitStore::commit`] and never edited afterwards.
//!
//! ## Hashes
//!
//! Commit hashes are short (7 hex characters) SHA-256 digests seeded with a
//! random UUID. They are identifiers, not content addresses: two commits of
//! identical content get different hashes, and uniqueness is not checked.
//!
//! ```rust
//! use termfs::commit::Commit;
//! use termfs::snapshot::Snapshot;
//!
//! let commit = Commit::new("first", None, Snapshot::new());
//! assert_eq!(commit.hash.len(), 7);
//! assert!(commit.is_root());
//! ```

use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Number of hex characters kept from the digest
pub const SHORT_HASH_LEN: usize = 7;

/// An immutable commit in the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Short hex identifier
    pub hash: String,
    /// Non-empty commit message
    pub message: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Parent commit hash (None for a root commit)
    pub parent_hash: Option<String>,
    /// Full path-to-content map at commit time
    pub snapshot: Snapshot,
}

impl Commit {
    /// Create a commit stamped with the current time and a fresh hash
    pub fn new(message: impl Into<String>, parent_hash: Option<String>, snapshot: Snapshot) -> Self {
        let message = message.into();
        let timestamp = Utc::now();
        let hash = generate_hash(&message, &timestamp, parent_hash.as_deref());
        Self {
            hash,
            message,
            timestamp,
            parent_hash,
            snapshot,
        }
    }

    /// Whether this commit has no parent
    pub fn is_root(&self) -> bool {
        self.parent_hash.is_none()
    }

    /// First line of the message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// One-line description used by log output
    pub fn display_format(&self) -> String {
        format!(
            "{} - {} ({} files)",
            self.hash,
            self.summary(),
            self.snapshot.len()
        )
    }
}

/// Generate a short commit hash
///
/// Seeded with a random UUID so that identical messages at identical times
/// still get distinct hashes with overwhelming probability.
pub fn generate_hash(message: &str, timestamp: &DateTime<Utc>, parent: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(message.as_bytes());
    hasher.update(timestamp.to_rfc3339().as_bytes());
    hasher.update(parent.unwrap_or("").as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..SHORT_HASH_LEN].to_string()
}

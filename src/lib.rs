//! # termfs - A virtual filesystem with a git-like history
//!
//! An in-memory hierarchical filesystem with Unix path semantics, and a
//! simplified version-control engine layered on top of it. Both persist
//! themselves to a key-value store after every mutation.
//!
//! ## Overview
//!
//! termfs provides:
//! - A typed file/directory tree with `cd`, `ls`, `cat`, `touch`, `mkdir`,
//!   `rm`, `cp`, `mv`, `find`, `grep` and tab completion
//! - Unix path resolution (`.`, `..`, duplicate slashes, relative paths)
//! - A git-like engine: staging, commits with full snapshots, branches,
//!   checkout and fast-forward-only merges
//! - Schema-versioned JSON persistence over a pluggable [`KeyValueStore`]
//!
//! ## Architecture
//!
//! - **FileSystem**: owns the node tree and the working directory
//! - **GitStore**: owns branches, commits and the staging area, and reaches
//!   the filesystem only through its path-based API
//! - **Snapshots**: full path-to-content maps; changes are detected by string
//!   equality, with no hashing and no line diffs
//! - **Workspace**: explicit context object bundling both over one store, so
//!   independent sessions never share state
//!
//! ## Quick Start
//!
//! ```rust
//! use termfs::{MergeOutcome, Workspace};
//!
//! # fn main() -> termfs::Result<()> {
//! let mut ws = Workspace::in_memory()?;
//!
//! ws.filesystem.mkdir("/tmp/x")?;
//! ws.filesystem.write_file("/tmp/x/a.txt", "hi")?;
//! assert_eq!(ws.filesystem.cat("/tmp/x/a.txt")?, "hi");
//!
//! ws.git.init()?;
//! ws.git.add(&ws.filesystem, "/tmp/x/a.txt")?;
//! ws.git.commit(&ws.filesystem, "first")?;
//!
//! ws.git.branch("feature")?;
//! ws.git.checkout(&mut ws.filesystem, "feature")?;
//! ws.filesystem.write_file("/tmp/x/b.txt", "more")?;
//! ws.git.add(&ws.filesystem, "/tmp/x/b.txt")?;
//! ws.git.commit(&ws.filesystem, "second")?;
//!
//! ws.git.checkout(&mut ws.filesystem, "main")?;
//! let outcome = ws.git.merge(&mut ws.filesystem, "feature")?;
//! assert!(matches!(outcome, MergeOutcome::FastForward { .. }));
//! assert!(ws.filesystem.exists("/tmp/x/b.txt"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Persistence
//!
//! The filesystem and the repository are stored as two JSON blobs under
//! `<prefix>.filesystem` and `<prefix>.git`. Each carries a schema version;
//! a blob with a different version is discarded and defaults are rebuilt.
//! Write failures (including quota errors) are logged and ignored, and the
//! in-memory state stays authoritative for the session.
//!
//! ## Limitations
//!
//! - Commit hashes are 7 hex characters and are not checked for collisions
//! - Only fast-forward merges; diverged branches are rejected
//! - Checking out a commit prefix does not track a separate detached HEAD
//! - Single writer: callers must not interleave commands on one workspace
//!
//! ## Error Handling
//!
//! Every fallible operation returns `Result<T, TermfsError>`. The error's
//! `Display` text is meant to be shown to the user as-is, and
//! [`TermfsError::kind`] gives the coarse category.
//!
//! ## Module Organization
//!
//! - [`path`]: path resolution helpers
//! - [`node`]: tree nodes
//! - [`filesystem`]: the virtual filesystem
//! - [`snapshot`]: snapshots and change classification
//! - [`commit`] and [`graph`]: commit records and the commit graph
//! - [`git`]: the version-control engine
//! - [`workspace`]: context object and builder
//! - [`storage`]: key-value backends
//! - [`types`]: shared option and result records
//! - [`error`]: error types

pub mod commit;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod graph;
pub mod node;
pub mod path;
pub mod snapshot;
pub mod storage;
pub mod types;
pub mod utils;
pub mod workspace;

// Re-export main types for convenience
pub use commit::Commit;
pub use error::{ErrorKind, Result, TermfsError};
pub use filesystem::{FileSystem, FS_SCHEMA_VERSION};
pub use git::{GitStore, DEFAULT_BRANCH, GIT_SCHEMA_VERSION};
pub use graph::CommitGraph;
pub use node::{Node, NodeType};
pub use snapshot::Snapshot;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::*;
pub use workspace::{Workspace, WorkspaceBuilder};

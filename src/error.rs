//! Error types for the termfs library
//!
//! This module defines all error types that can occur during filesystem and
//! version-control operations. Every expected failure is returned as a value,
//! never raised as a panic, and the `Display` text of each variant is the
//! message surfaced verbatim to the user.
//!
//! Variants are grouped into a small taxonomy through [`ErrorKind`], which is
//! what command handlers usually branch on.

use thiserror::Error;

/// Type alias for Results in the termfs library
pub type Result<T> = std::result::Result<T, TermfsError>;

/// Broad category of a [`TermfsError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Path, branch or commit does not exist
    NotFound,
    /// File used where a directory was expected, or the reverse
    TypeMismatch,
    /// Target already exists
    AlreadyExists,
    /// Operation is valid in general but not in the current state
    PreconditionFailed,
    /// Malformed input or a disallowed operation on the root
    InvalidInput,
    /// Persistence backend failure
    Storage,
}

/// Main error type for all termfs operations
#[derive(Debug, Error)]
pub enum TermfsError {
    /// Path does not exist
    #[error("No such file or directory: {0}")]
    NotFound(String),

    /// Directory given where a file was expected
    #[error("Is a directory: {0}")]
    IsADirectory(String),

    /// File given where a directory was expected
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Target path is already taken
    #[error("File exists: {0}")]
    AlreadyExists(String),

    /// Non-empty directory removed without the recursive flag
    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Malformed argument or disallowed operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Pattern given to find/grep could not be compiled
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as supplied by the caller
        pattern: String,
        /// Compiler error message
        reason: String,
    },

    /// Git operation attempted before `init`
    #[error("Not a git repository (run 'git init' first)")]
    NotARepository,

    /// `init` called twice
    #[error("Git repository already initialized")]
    AlreadyInitialized,

    /// Commit message empty or whitespace only
    #[error("Aborting commit due to empty commit message")]
    EmptyCommitMessage,

    /// Commit requested with an empty staging area
    #[error("Nothing to commit (use 'git add' to stage changes)")]
    NothingToCommit,

    /// Operation needs at least one commit on the current branch
    #[error("Branch '{0}' does not have any commits yet")]
    NoCommits(String),

    /// Branch name not known
    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    /// Branch name already taken
    #[error("A branch named '{0}' already exists")]
    BranchExists(String),

    /// Branch name rejected by validation
    #[error("Invalid branch name '{name}': {reason}")]
    InvalidBranchName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// No commit or branch matches the reference
    #[error("Unknown revision: {0}")]
    CommitNotFound(String),

    /// `add` on a path that neither exists nor was tracked
    #[error("Pathspec '{0}' did not match any files")]
    PathspecNotMatched(String),

    /// Attempt to delete the checked-out branch
    #[error("Cannot delete branch '{0}': it is the current branch")]
    CannotDeleteCurrentBranch(String),

    /// Checkout or merge blocked by local changes
    #[error("You have uncommitted changes; commit them before switching ({0} path(s) affected)")]
    UncommittedChanges(usize),

    /// Checkout or merge that would clobber files not under version control
    #[error("Untracked files would be overwritten: {}", .0.join(", "))]
    UntrackedWouldBeOverwritten(Vec<String>),

    /// Merge that would require combining diverged histories
    #[error("Cannot merge '{source_branch}' into '{target}': not a fast-forward (branches have diverged)")]
    NonFastForward {
        /// Branch being merged in
        source_branch: String,
        /// Branch receiving the merge
        target: String,
    },

    /// I/O errors from the file-backed store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Write would exceed the configured storage quota
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} bytes available")]
    QuotaExceeded {
        /// Bytes the store would hold after the write
        needed: u64,
        /// Configured quota
        quota: u64,
    },

    /// Generic storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TermfsError {
    /// Create a storage error with a custom message
    pub fn storage(msg: impl Into<String>) -> Self {
        TermfsError::Storage(msg.into())
    }

    /// Create an invalid-input error with a custom message
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        TermfsError::InvalidInput(msg.into())
    }

    /// Create an invalid-branch-name error
    pub fn invalid_branch_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TermfsError::InvalidBranchName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TermfsError::NotFound(_)
            | TermfsError::BranchNotFound(_)
            | TermfsError::CommitNotFound(_)
            | TermfsError::PathspecNotMatched(_) => ErrorKind::NotFound,

            TermfsError::IsADirectory(_) | TermfsError::NotADirectory(_) => ErrorKind::TypeMismatch,

            TermfsError::AlreadyExists(_)
            | TermfsError::AlreadyInitialized
            | TermfsError::BranchExists(_) => ErrorKind::AlreadyExists,

            TermfsError::DirectoryNotEmpty(_)
            | TermfsError::NotARepository
            | TermfsError::EmptyCommitMessage
            | TermfsError::NothingToCommit
            | TermfsError::NoCommits(_)
            | TermfsError::CannotDeleteCurrentBranch(_)
            | TermfsError::UncommittedChanges(_)
            | TermfsError::UntrackedWouldBeOverwritten(_)
            | TermfsError::NonFastForward { .. } => ErrorKind::PreconditionFailed,

            TermfsError::InvalidInput(_)
            | TermfsError::InvalidPattern { .. }
            | TermfsError::InvalidBranchName { .. } => ErrorKind::InvalidInput,

            TermfsError::Io(_)
            | TermfsError::Json(_)
            | TermfsError::QuotaExceeded { .. }
            | TermfsError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Check if this error came from the persistence layer
    ///
    /// Such errors are logged and swallowed by the stores: the in-memory
    /// state stays authoritative for the session.
    pub fn is_storage(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }
}

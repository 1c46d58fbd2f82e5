//! Simplified git engine layered over the virtual filesystem
//!
//! [`GitStore`] keeps branches, an append-only [`CommitGraph`] and a staging
//! area, and talks to the [`FileSystem`] only through its path-based API:
//! listing paths, reading content and restoring from a snapshot.
//!
//! ## Model
//!
//! - Every commit stores a full [`Snapshot`]; there is no object store
//! - Per-path status is derived on demand from three inputs: the live tree,
//!   the snapshot of the current head (`last_snapshot`) and the staging set
//! - Only fast-forward merges are supported; diverged branches are rejected
//! - `last_snapshot` is a cache of the head commit's snapshot. It is never
//!   persisted and is recomputed on load
//!
//! ## Detached checkouts
//!
//! Checking out a commit prefix restores that commit's snapshot and makes it
//! the comparison base for the rest of the session, but leaves the current
//! branch pointer alone. A commit made in that state still gets the branch
//! head as its parent. Reloading the state returns to the branch head.
//!
//! ## Examples
//!
//! ```rust
//! use termfs::{FileSystem, GitStore, MemoryStore, WorkspaceConfig};
//! use std::sync::Arc;
//!
//! # fn main() -> termfs::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let config = WorkspaceConfig::default();
//! let mut fs = FileSystem::new(store.clone(), &config);
//! let mut git = GitStore::new(store, &config);
//! fs.initialize()?;
//! git.initialize()?;
//!
//! git.init()?;
//! fs.write_file("/tmp/a.txt", "hi")?;
//! git.add(&fs, "/tmp/a.txt")?;
//! let commit = git.commit(&fs, "first")?;
//! assert_eq!(git.log(None)?[0].hash, commit.hash);
//! # Ok(())
//! # }
//! ```

use crate::commit::Commit;
use crate::error::{Result, TermfsError};
use crate::filesystem::FileSystem;
use crate::graph::CommitGraph;
use crate::path;
use crate::snapshot::{self, Snapshot};
use crate::storage::KeyValueStore;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

/// Version of the persisted git blob; other versions are discarded
pub const GIT_SCHEMA_VERSION: u32 = 1;

/// Branch created by `init`
pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GitState {
    version: u32,
    initialized: bool,
    current_branch: String,
    branches: BTreeMap<String, String>,
    commits: CommitGraph,
    staging_area: BTreeSet<String>,
}

impl GitState {
    fn empty() -> Self {
        Self {
            version: GIT_SCHEMA_VERSION,
            initialized: false,
            current_branch: DEFAULT_BRANCH.to_string(),
            branches: BTreeMap::new(),
            commits: CommitGraph::new(),
            staging_area: BTreeSet::new(),
        }
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// Branches, commits and staging area of a repository
pub struct GitStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    state: GitState,
    last_snapshot: Snapshot,
    detached_head: Option<String>,
    loaded: bool,
}

impl std::fmt::Debug for GitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitStore")
            .field("key", &self.key)
            .field("initialized", &self.state.initialized)
            .field("current_branch", &self.state.current_branch)
            .field("commits", &self.state.commits.len())
            .field("staged", &self.state.staging_area.len())
            .finish()
    }
}

impl GitStore {
    /// Create an uninitialized repository over `store`
    pub fn new(store: Arc<dyn KeyValueStore>, config: &WorkspaceConfig) -> Self {
        Self {
            store,
            key: format!("{}.git", config.key_prefix),
            state: GitState::empty(),
            last_snapshot: Snapshot::new(),
            detached_head: None,
            loaded: false,
        }
    }

    /// Load persisted state and rebuild the head snapshot cache
    ///
    /// Idempotent. Branches pointing at commits that do not exist are dropped
    /// and the repaired state persisted.
    #[instrument(skip(self), fields(key = %self.key))]
    pub fn initialize(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        if let Some(mut state) = self.load_state() {
            let dangling: Vec<String> = state
                .branches
                .iter()
                .filter(|(_, hash)| !state.commits.contains(hash))
                .map(|(name, _)| name.clone())
                .collect();
            for name in &dangling {
                warn!("Dropping branch {} pointing at a missing commit", name);
                state.branches.remove(name);
            }
            if state.current_branch.is_empty() {
                state.current_branch = DEFAULT_BRANCH.to_string();
            }
            self.state = state;
            if !dangling.is_empty() {
                self.persist();
            }
        }

        self.last_snapshot = self.head_snapshot();
        self.loaded = true;
        debug!(
            "Git state loaded: initialized={}, {} commits, {} branches",
            self.state.initialized,
            self.state.commits.len(),
            self.state.branches.len()
        );
        Ok(())
    }

    /// Whether `init` has been run
    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    /// Name of the current branch
    pub fn current_branch(&self) -> &str {
        &self.state.current_branch
    }

    /// Commit checked out by prefix this session, if any
    pub fn detached_head(&self) -> Option<&str> {
        self.detached_head.as_deref()
    }

    /// Head commit of the current branch
    pub fn head(&self) -> Option<&str> {
        self.state
            .branches
            .get(&self.state.current_branch)
            .map(String::as_str)
    }

    /// Paths currently staged
    pub fn staged_paths(&self) -> impl Iterator<Item = &str> {
        self.state.staging_area.iter().map(String::as_str)
    }

    /// Create an empty repository on branch `main`
    #[instrument(skip(self))]
    pub fn init(&mut self) -> Result<()> {
        if self.state.initialized {
            return Err(TermfsError::AlreadyInitialized);
        }
        self.state = GitState {
            initialized: true,
            ..GitState::empty()
        };
        self.last_snapshot.clear();
        self.detached_head = None;
        info!("Initialized empty repository on branch {}", DEFAULT_BRANCH);
        self.persist();
        Ok(())
    }

    /// Classify every path against the last commit and the staging area
    pub fn status(&self, fs: &FileSystem) -> Result<StatusReport> {
        self.require_repo()?;
        let current = snapshot::capture(fs);
        Ok(self.status_of(&current))
    }

    fn status_of(&self, current: &Snapshot) -> StatusReport {
        let staging = &self.state.staging_area;
        let mut report = StatusReport {
            branch: self.state.current_branch.clone(),
            ..Default::default()
        };

        for staged in staging {
            if let Some(change) = snapshot::classify_path(staged, current, &self.last_snapshot) {
                report.staged.push(StatusEntry {
                    path: staged.clone(),
                    change,
                });
            }
        }

        let paths: BTreeSet<&String> = current.keys().chain(self.last_snapshot.keys()).collect();
        for p in paths.into_iter().filter(|p| !staging.contains(*p)) {
            match snapshot::classify_path(p, current, &self.last_snapshot) {
                Some(ChangeKind::Added) => report.untracked.push(p.clone()),
                Some(change @ (ChangeKind::Modified | ChangeKind::Deleted)) => {
                    report.unstaged.push(StatusEntry {
                        path: p.clone(),
                        change,
                    })
                }
                Some(ChangeKind::Unchanged) | None => {}
            }
        }

        report
    }

    /// Stage a file, or every changed path under a directory
    ///
    /// The path must exist now or have been tracked by the last commit.
    /// Paths whose content matches the last commit are not staged. Returns
    /// the number of paths staged.
    pub fn add(&mut self, fs: &FileSystem, target: &str) -> Result<usize> {
        self.require_repo()?;
        let abs = fs.resolve_path(target);
        let current = snapshot::capture(fs);

        let matched = fs.exists(&abs)
            || self
                .last_snapshot
                .keys()
                .chain(self.state.staging_area.iter())
                .any(|p| path::is_within(p, &abs));
        if !matched {
            return Err(TermfsError::PathspecNotMatched(target.to_string()));
        }
        self.prune_vanished(&current);

        let changed: Vec<String> = snapshot::changed_paths(&current, &self.last_snapshot)
            .into_iter()
            .filter(|p| path::is_within(p, &abs))
            .collect();
        let count = changed.len();
        for p in changed {
            trace!("Staging {}", p);
            self.state.staging_area.insert(p);
        }

        debug!("Staged {} path(s) under {}", count, abs);
        self.persist();
        Ok(count)
    }

    /// Replace the staging area with every path that differs from the last commit
    pub fn add_all(&mut self, fs: &FileSystem) -> Result<usize> {
        self.require_repo()?;
        let current = snapshot::capture(fs);
        self.state.staging_area = snapshot::changed_paths(&current, &self.last_snapshot);
        let count = self.state.staging_area.len();
        debug!("Staged all {} changed path(s)", count);
        self.persist();
        Ok(count)
    }

    /// Unstage a path, or every staged path under a directory
    pub fn reset(&mut self, fs: &FileSystem, target: &str) -> Result<usize> {
        self.require_repo()?;
        let abs = fs.resolve_path(target);
        let before = self.state.staging_area.len();
        self.state
            .staging_area
            .retain(|p| !path::is_within(p, &abs));
        let removed = before - self.state.staging_area.len();
        debug!("Unstaged {} path(s) under {}", removed, abs);
        self.persist();
        Ok(removed)
    }

    /// Clear the staging area
    pub fn reset_all(&mut self) -> Result<usize> {
        self.require_repo()?;
        let removed = self.state.staging_area.len();
        self.state.staging_area.clear();
        self.persist();
        Ok(removed)
    }

    /// Record the staged paths as a new commit on the current branch
    ///
    /// The new snapshot is the last commit's snapshot with every staged path
    /// taken from the live tree; staged paths that no longer exist are
    /// dropped from it.
    #[instrument(skip(self, fs))]
    pub fn commit(&mut self, fs: &FileSystem, message: &str) -> Result<Commit> {
        self.require_repo()?;
        let message = message.trim();
        if message.is_empty() {
            return Err(TermfsError::EmptyCommitMessage);
        }

        let current = snapshot::capture(fs);
        if self.prune_vanished(&current) > 0 {
            self.persist();
        }
        if self.state.staging_area.is_empty() {
            return Err(TermfsError::NothingToCommit);
        }

        let new_snapshot = snapshot::overlay(&self.last_snapshot, &current, &self.state.staging_area);
        if new_snapshot == self.last_snapshot {
            return Err(TermfsError::NothingToCommit);
        }
        let parent = self.head().map(str::to_string);
        let commit = Commit::new(message, parent, new_snapshot);

        self.state.commits.push(commit.clone());
        self.state
            .branches
            .insert(self.state.current_branch.clone(), commit.hash.clone());
        self.state.staging_area.clear();
        self.last_snapshot = commit.snapshot.clone();
        self.detached_head = None;

        info!(
            "[{} {}] {}",
            self.state.current_branch,
            commit.hash,
            commit.summary()
        );
        self.persist();
        Ok(commit)
    }

    /// History of the current branch, newest first
    pub fn log(&self, limit: Option<usize>) -> Result<Vec<LogEntry>> {
        self.require_repo()?;
        let head = self
            .head()
            .ok_or_else(|| TermfsError::NoCommits(self.state.current_branch.clone()))?;

        Ok(self
            .state
            .commits
            .ancestry(Some(head))
            .take(limit.unwrap_or(usize::MAX))
            .map(|c| LogEntry {
                hash: c.hash.clone(),
                message: c.message.clone(),
                timestamp: c.timestamp,
                parent_hash: c.parent_hash.clone(),
                branches: self.branches_at(&c.hash),
            })
            .collect())
    }

    /// First commit whose hash starts with `prefix`, with its changes
    pub fn show(&self, prefix: &str) -> Result<CommitDetails> {
        self.require_repo()?;
        let commit = self
            .state
            .commits
            .find_by_prefix(prefix)
            .ok_or_else(|| TermfsError::CommitNotFound(prefix.to_string()))?;

        let empty = Snapshot::new();
        let parent_snapshot = commit
            .parent_hash
            .as_deref()
            .and_then(|h| self.state.commits.get(h))
            .map(|c| &c.snapshot)
            .unwrap_or(&empty);

        Ok(CommitDetails {
            commit: commit.clone(),
            branches: self.branches_at(&commit.hash),
            changes: snapshot::diff(&commit.snapshot, parent_snapshot),
        })
    }

    /// Every branch, including an unborn current branch, sorted by name
    pub fn list_branches(&self) -> Result<Vec<BranchInfo>> {
        self.require_repo()?;
        let current = &self.state.current_branch;
        let mut branches: Vec<BranchInfo> = self
            .state
            .branches
            .iter()
            .map(|(name, hash)| BranchInfo {
                name: name.clone(),
                head: Some(hash.clone()),
                is_current: name == current,
            })
            .collect();

        if !self.state.branches.contains_key(current) {
            branches.push(BranchInfo {
                name: current.clone(),
                head: None,
                is_current: true,
            });
            branches.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(branches)
    }

    /// Create a branch at the current head
    pub fn branch(&mut self, name: &str) -> Result<()> {
        self.require_repo()?;
        path::validate_branch_name(name)?;
        if self.state.branches.contains_key(name) || name == self.state.current_branch {
            return Err(TermfsError::BranchExists(name.to_string()));
        }
        let head = self
            .head()
            .ok_or_else(|| TermfsError::NoCommits(self.state.current_branch.clone()))?
            .to_string();

        info!("Created branch {} at {}", name, head);
        self.state.branches.insert(name.to_string(), head);
        self.persist();
        Ok(())
    }

    /// Delete a branch other than the current one
    pub fn delete_branch(&mut self, name: &str) -> Result<()> {
        self.require_repo()?;
        if name == self.state.current_branch {
            return Err(TermfsError::CannotDeleteCurrentBranch(name.to_string()));
        }
        if self.state.branches.remove(name).is_none() {
            return Err(TermfsError::BranchNotFound(name.to_string()));
        }
        info!("Deleted branch {}", name);
        self.persist();
        Ok(())
    }

    /// Switch to a branch, or restore a commit found by hash prefix
    ///
    /// Branch names win over commit prefixes. Refuses while staged or
    /// unstaged changes exist. Untracked files are left in place, and the
    /// checkout fails if the target would replace one with other content.
    #[instrument(skip(self, fs))]
    pub fn checkout(&mut self, fs: &mut FileSystem, target: &str) -> Result<CheckoutResult> {
        self.require_repo()?;
        self.require_clean(fs)?;

        if self.state.branches.contains_key(target) || target == self.state.current_branch {
            let head = self.state.branches.get(target).cloned();
            let target_snapshot = self.snapshot_of(head.as_deref());
            self.require_untracked_preserved(fs, &target_snapshot)?;
            let restore = fs.restore_from_snapshot(&target_snapshot, &self.last_snapshot)?;

            self.state.current_branch = target.to_string();
            self.last_snapshot = target_snapshot;
            self.detached_head = None;
            info!("Switched to branch {}", target);
            self.persist();

            return Ok(CheckoutResult {
                branch: target.to_string(),
                commit: head,
                detached: false,
                restore,
            });
        }

        let commit = self
            .state
            .commits
            .find_by_prefix(target)
            .ok_or_else(|| TermfsError::BranchNotFound(target.to_string()))?;
        let hash = commit.hash.clone();
        let target_snapshot = commit.snapshot.clone();
        self.require_untracked_preserved(fs, &target_snapshot)?;
        let restore = fs.restore_from_snapshot(&target_snapshot, &self.last_snapshot)?;

        self.last_snapshot = target_snapshot;
        self.detached_head = Some(hash.clone());
        info!("Checked out commit {} (branch {} unchanged)", hash, self.state.current_branch);

        Ok(CheckoutResult {
            branch: self.state.current_branch.clone(),
            commit: Some(hash),
            detached: true,
            restore,
        })
    }

    /// Fast-forward the current branch to another branch's head
    #[instrument(skip(self, fs))]
    pub fn merge(&mut self, fs: &mut FileSystem, source: &str) -> Result<MergeOutcome> {
        self.require_repo()?;
        let source_head = self
            .state
            .branches
            .get(source)
            .cloned()
            .ok_or_else(|| TermfsError::BranchNotFound(source.to_string()))?;
        self.require_clean(fs)?;

        let current_head = self.head().map(str::to_string);
        if let Some(head) = current_head.as_deref() {
            if self.state.commits.is_ancestor(&source_head, head) {
                debug!("{} is already contained in {}", source, self.state.current_branch);
                return Ok(MergeOutcome::AlreadyUpToDate);
            }
            if !self.state.commits.is_ancestor(head, &source_head) {
                return Err(TermfsError::NonFastForward {
                    source_branch: source.to_string(),
                    target: self.state.current_branch.clone(),
                });
            }
        }

        let target_snapshot = self.snapshot_of(Some(&source_head));
        self.require_untracked_preserved(fs, &target_snapshot)?;
        let restore = fs.restore_from_snapshot(&target_snapshot, &self.last_snapshot)?;

        self.state
            .branches
            .insert(self.state.current_branch.clone(), source_head.clone());
        self.last_snapshot = target_snapshot;
        self.detached_head = None;
        info!(
            "Fast-forwarded {} to {} ({})",
            self.state.current_branch, source_head, source
        );
        self.persist();

        Ok(MergeOutcome::FastForward {
            from: current_head,
            to: source_head,
            restore,
        })
    }

    /// Whole-content changes of tracked files that are not staged
    pub fn diff(&self, fs: &FileSystem) -> Result<Vec<DiffEntry>> {
        self.require_repo()?;
        let current = snapshot::capture(fs);
        Ok(self
            .last_snapshot
            .keys()
            .filter(|p| !self.state.staging_area.contains(*p))
            .filter_map(|p| snapshot::diff_entry(p, &current, &self.last_snapshot))
            .collect())
    }

    /// Whole-content changes of staged paths
    pub fn diff_staged(&self, fs: &FileSystem) -> Result<Vec<DiffEntry>> {
        self.require_repo()?;
        let current = snapshot::capture(fs);
        Ok(self
            .state
            .staging_area
            .iter()
            .filter_map(|p| snapshot::diff_entry(p, &current, &self.last_snapshot))
            .collect())
    }

    /// Whether staged or unstaged changes exist; false outside a repository
    pub fn has_uncommitted_changes(&self, fs: &FileSystem) -> bool {
        self.status(fs).is_ok_and(|report| report.has_changes())
    }

    /// Forget the repository entirely
    #[instrument(skip(self))]
    pub fn reset_state(&mut self) {
        info!("Resetting git state");
        self.state = GitState::empty();
        self.last_snapshot.clear();
        self.detached_head = None;
        self.persist();
    }

    fn require_repo(&self) -> Result<()> {
        if self.state.initialized {
            Ok(())
        } else {
            Err(TermfsError::NotARepository)
        }
    }

    fn require_clean(&self, fs: &FileSystem) -> Result<()> {
        let report = self.status_of(&snapshot::capture(fs));
        if report.has_changes() {
            return Err(TermfsError::UncommittedChanges(report.change_count()));
        }
        Ok(())
    }

    /// Refuse a restore that would replace untracked files with different content
    fn require_untracked_preserved(&self, fs: &FileSystem, target: &Snapshot) -> Result<()> {
        let current = snapshot::capture(fs);
        let clobbered: Vec<String> = current
            .iter()
            .filter(|(p, _)| !self.last_snapshot.contains_key(*p))
            .filter(|(p, content)| target.get(*p).is_some_and(|t| t != *content))
            .map(|(p, _)| p.clone())
            .collect();
        if clobbered.is_empty() {
            return Ok(());
        }
        warn!("Refusing to overwrite {} untracked file(s)", clobbered.len());
        Err(TermfsError::UntrackedWouldBeOverwritten(clobbered))
    }

    /// Drop staged paths that exist neither in the tree nor in the last commit
    fn prune_vanished(&mut self, current: &Snapshot) -> usize {
        let last = &self.last_snapshot;
        let before = self.state.staging_area.len();
        self.state
            .staging_area
            .retain(|p| current.contains_key(p) || last.contains_key(p));
        let pruned = before - self.state.staging_area.len();
        if pruned > 0 {
            debug!("Unstaged {} path(s) that no longer exist", pruned);
        }
        pruned
    }

    fn branches_at(&self, hash: &str) -> Vec<String> {
        self.state
            .branches
            .iter()
            .filter(|(_, h)| h.as_str() == hash)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn snapshot_of(&self, hash: Option<&str>) -> Snapshot {
        hash.and_then(|h| self.state.commits.get(h))
            .map(|c| c.snapshot.clone())
            .unwrap_or_default()
    }

    fn head_snapshot(&self) -> Snapshot {
        self.snapshot_of(self.head())
    }

    fn load_state(&self) -> Option<GitState> {
        let json = match self.store.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read git state: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<VersionProbe>(&json) {
            Ok(probe) if probe.version == GIT_SCHEMA_VERSION => {}
            Ok(probe) => {
                warn!(
                    "Discarding git state with schema version {} (expected {})",
                    probe.version, GIT_SCHEMA_VERSION
                );
                return None;
            }
            Err(e) => {
                warn!("Discarding unreadable git state: {}", e);
                return None;
            }
        }

        serde_json::from_str(&json)
            .map_err(|e| warn!("Discarding unreadable git state: {}", e))
            .ok()
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.state) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize git state: {}", e);
                return;
            }
        };
        match self.store.set(&self.key, &json) {
            Ok(()) => trace!("Persisted git state ({} bytes)", json.len()),
            Err(e) => warn!("Failed to persist git state: {}", e),
        }
    }
}

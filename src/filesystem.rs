//! The virtual filesystem store
//!
//! [`FileSystem`] owns the node tree and the current working directory, and
//! exposes the Unix-like operations that command handlers call: `cd`, `ls`,
//! `cat`, `touch`, `mkdir`, `rm`, `cp`, `mv`, `find`, `grep` and friends.
//!
//! ## Overview
//!
//! - Every path argument goes through [`crate::path::resolve`] against the
//!   current working directory
//! - Expected failures come back as [`TermfsError`] values, never panics
//! - Every successful mutation persists the whole state synchronously to the
//!   backing [`KeyValueStore`]; persistence failures are logged and ignored
//!   so the in-memory tree stays authoritative for the session
//! - The cwd always names an existing directory
//!
//! ## Examples
//!
//! ```rust
//! use termfs::{FileSystem, MemoryStore, WorkspaceConfig};
//! use std::sync::Arc;
//!
//! # fn main() -> termfs::Result<()> {
//! let mut fs = FileSystem::new(Arc::new(MemoryStore::new()), &WorkspaceConfig::default());
//! fs.initialize()?;
//!
//! fs.mkdir("/tmp/x")?;
//! fs.write_file("/tmp/x/a.txt", "hi")?;
//! assert_eq!(fs.cat("/tmp/x/a.txt")?, "hi");
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, TermfsError};
use crate::node::Node;
use crate::path::{self, ROOT};
use crate::snapshot::Snapshot;
use crate::storage::KeyValueStore;
use crate::types::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

/// Version of the persisted filesystem blob; other versions are discarded
pub const FS_SCHEMA_VERSION: u32 = 1;

/// Persisted shape of the filesystem
#[derive(Debug, Deserialize)]
struct FsState {
    version: u32,
    root: Node,
    cwd: String,
}

#[derive(Serialize)]
struct FsStateRef<'a> {
    version: u32,
    root: &'a Node,
    cwd: &'a str,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// In-memory hierarchical filesystem with key-value persistence
pub struct FileSystem {
    store: Arc<dyn KeyValueStore>,
    key: String,
    home_dir: String,
    user: String,
    root: Node,
    cwd: String,
    initialized: bool,
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("key", &self.key)
            .field("cwd", &self.cwd)
            .field("home_dir", &self.home_dir)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl FileSystem {
    /// Create a filesystem over `store` holding the default contents
    ///
    /// Nothing is read or written until [`FileSystem::initialize`] is called.
    pub fn new(store: Arc<dyn KeyValueStore>, config: &WorkspaceConfig) -> Self {
        let home_dir = path::normalize(&config.home_dir);
        let root = default_tree_or_empty(&home_dir, &config.user);
        Self {
            store,
            key: format!("{}.filesystem", config.key_prefix),
            cwd: home_dir.clone(),
            home_dir,
            user: config.user.clone(),
            root,
            initialized: false,
        }
    }

    /// Load persisted state, or build and persist the default contents
    ///
    /// Idempotent. A blob with a different schema version, or one that does
    /// not decode, is replaced by defaults. An invalid cwd is reset to the
    /// home directory and the correction persisted.
    #[instrument(skip(self), fields(key = %self.key))]
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        match self.load_state() {
            Some(mut state) => {
                let repaired = state.root.repair_names();
                if repaired > 0 {
                    warn!("Repaired {} node names while loading filesystem", repaired);
                }
                self.root = state.root;
                self.cwd = state.cwd;
                debug!("Loaded filesystem state, cwd {}", self.cwd);
                if self.validate_cwd() || repaired > 0 {
                    self.persist();
                }
            }
            None => {
                info!("Building default filesystem");
                self.root = default_tree(&self.home_dir, &self.user)?;
                self.cwd = self.home_dir.clone();
                self.persist();
            }
        }

        self.initialized = true;
        Ok(())
    }

    /// Whether [`FileSystem::initialize`] has run
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Resolve a path against the current working directory
    pub fn resolve_path(&self, path: &str) -> String {
        path::resolve(path, &self.cwd)
    }

    /// Current working directory
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Configured home directory
    pub fn home_dir(&self) -> &str {
        &self.home_dir
    }

    /// Change the working directory, returning the new absolute cwd
    pub fn cd(&mut self, path: &str) -> Result<String> {
        let abs = self.resolve_path(path);
        let node = self.require(&abs)?;
        if !node.is_dir() {
            return Err(TermfsError::NotADirectory(abs));
        }
        debug!("cd {}", abs);
        self.cwd = abs;
        self.persist();
        Ok(self.cwd.clone())
    }

    /// List a directory, or a single-entry listing for a file
    ///
    /// Defaults to the cwd. Directories come before files, then names sort
    /// byte-wise (case-sensitive). Hidden entries are dropped unless `all`.
    pub fn ls(&self, path: Option<&str>, options: LsOptions) -> Result<Vec<LsEntry>> {
        let abs = self.resolve_path(path.unwrap_or(""));
        let node = self.require(&abs)?;

        let Some(children) = node.children() else {
            return Ok(vec![make_entry(node, &abs, options.long)]);
        };

        let mut entries: Vec<LsEntry> = children
            .values()
            .filter(|child| options.all || !child.name().starts_with('.'))
            .map(|child| make_entry(child, &path::join_path(&abs, child.name()), options.long))
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    /// Metadata for a single path
    pub fn stat(&self, path: &str) -> Result<LsEntry> {
        let abs = self.resolve_path(path);
        let node = self.require(&abs)?;
        Ok(make_entry(node, &abs, true))
    }

    /// Read a file's content
    pub fn cat(&self, path: &str) -> Result<String> {
        let abs = self.resolve_path(path);
        let node = self.require(&abs)?;
        node.content()
            .map(str::to_string)
            .ok_or(TermfsError::IsADirectory(abs))
    }

    /// Create an empty file, or bump the modification time of an existing node
    pub fn touch(&mut self, path: &str) -> Result<()> {
        require_operand(path, "touch")?;
        let abs = self.resolve_path(path);

        if let Some(node) = self.root.lookup_mut(&abs) {
            node.touch();
            trace!("touch (bump) {}", abs);
        } else {
            self.insert_node(&abs, Node::file(path::base_name(&abs), ""))?;
            debug!("touch (create) {}", abs);
        }

        self.persist();
        Ok(())
    }

    /// Create a single directory; parents must already exist
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        require_operand(path, "mkdir")?;
        let abs = self.resolve_path(path);
        if self.root.lookup(&abs).is_some() {
            return Err(TermfsError::AlreadyExists(abs));
        }

        self.insert_node(&abs, Node::directory(path::base_name(&abs)))?;
        debug!("mkdir {}", abs);
        self.persist();
        Ok(())
    }

    /// Remove a file or directory
    ///
    /// Non-empty directories need `recursive`. A cwd at or below the removed
    /// path moves to the removed path's parent.
    pub fn rm(&mut self, path: &str, options: RmOptions) -> Result<()> {
        require_operand(path, "rm")?;
        let abs = self.resolve_path(path);
        if abs == ROOT {
            return Err(TermfsError::invalid_input("cannot remove the root directory"));
        }

        let node = self.require(&abs)?;
        if node.is_dir() && !node.is_empty_dir() && !options.recursive {
            return Err(TermfsError::DirectoryNotEmpty(abs));
        }

        self.remove_node(&abs)?;
        self.persist();
        Ok(())
    }

    /// Remove an empty directory
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        require_operand(path, "rmdir")?;
        let abs = self.resolve_path(path);
        if abs == ROOT {
            return Err(TermfsError::invalid_input("cannot remove the root directory"));
        }

        let node = self.require(&abs)?;
        if !node.is_dir() {
            return Err(TermfsError::NotADirectory(abs));
        }
        if !node.is_empty_dir() {
            return Err(TermfsError::DirectoryNotEmpty(abs));
        }

        self.remove_node(&abs)?;
        self.persist();
        Ok(())
    }

    /// Deep-copy `src` to `dest`, returning the path of the copy
    ///
    /// If `dest` is an existing directory the copy lands inside it under the
    /// source's name; otherwise `dest` names the copy. Every copied node gets
    /// fresh timestamps.
    pub fn cp(&mut self, src: &str, dest: &str) -> Result<String> {
        require_operand(src, "cp")?;
        require_operand(dest, "cp")?;
        let src_abs = self.resolve_path(src);
        let target = self.transfer_target(&src_abs, dest, "copy")?;

        let mut copy = self.require(&src_abs)?.fresh_copy();
        copy.set_name(path::base_name(&target));
        self.insert_node(&target, copy)?;

        debug!("cp {} -> {}", src_abs, target);
        self.persist();
        Ok(target)
    }

    /// Move or rename `src` to `dest`, returning the new path
    ///
    /// Same destination rules as [`FileSystem::cp`]; the node itself is
    /// relinked, keeping its timestamps. A cwd inside the moved directory
    /// follows it.
    pub fn mv(&mut self, src: &str, dest: &str) -> Result<String> {
        require_operand(src, "mv")?;
        require_operand(dest, "mv")?;
        let src_abs = self.resolve_path(src);
        if src_abs == ROOT {
            return Err(TermfsError::invalid_input("cannot move the root directory"));
        }
        let target = self.transfer_target(&src_abs, dest, "move")?;

        let mut node = self.detach(&src_abs)?;
        node.set_name(path::base_name(&target));
        self.insert_node(&target, node)?;

        if path::is_within(&self.cwd, &src_abs) {
            self.cwd = format!("{}{}", target, &self.cwd[src_abs.len()..]);
            debug!("cwd followed move to {}", self.cwd);
        }

        debug!("mv {} -> {}", src_abs, target);
        self.persist();
        Ok(target)
    }

    /// Create or replace a file's content
    pub fn write_file(&mut self, path: &str, content: &str) -> Result<()> {
        require_operand(path, "write")?;
        let abs = self.resolve_path(path);

        match self.root.lookup_mut(&abs) {
            Some(node) => {
                if !node.set_content(content) {
                    return Err(TermfsError::IsADirectory(abs));
                }
            }
            None => self.insert_node(&abs, Node::file(path::base_name(&abs), content))?,
        }

        trace!("wrote {} bytes to {}", content.len(), abs);
        self.persist();
        Ok(())
    }

    /// Create a file or append to its content
    pub fn append_file(&mut self, path: &str, content: &str) -> Result<()> {
        require_operand(path, "append")?;
        let abs = self.resolve_path(path);

        match self.root.lookup_mut(&abs) {
            Some(node) => {
                if !node.append_content(content) {
                    return Err(TermfsError::IsADirectory(abs));
                }
            }
            None => self.insert_node(&abs, Node::file(path::base_name(&abs), content))?,
        }

        trace!("appended {} bytes to {}", content.len(), abs);
        self.persist();
        Ok(())
    }

    /// Find nodes below `start` (inclusive) whose name matches a glob
    ///
    /// `*` matches any run of characters and `?` exactly one; everything else
    /// is literal. Results are absolute paths in depth-first order.
    pub fn find(&self, start: &str, pattern: &str) -> Result<Vec<String>> {
        let abs = self.resolve_path(start);
        let node = self.require(&abs)?;
        let regex = glob_to_regex(pattern)?;

        let mut matches = Vec::new();
        node.walk(&abs, &mut |p, n| {
            if regex.is_match(n.name()) {
                matches.push(p.to_string());
            }
        });
        Ok(matches)
    }

    /// Search file lines below `path` with a regular expression
    pub fn grep(&self, pattern: &str, path: &str) -> Result<Vec<GrepMatch>> {
        let regex = Regex::new(pattern).map_err(|e| TermfsError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let abs = self.resolve_path(path);
        let node = self.require(&abs)?;

        let mut matches = Vec::new();
        node.walk(&abs, &mut |p, n| {
            if let Some(content) = n.content() {
                for (idx, line) in content.lines().enumerate() {
                    if regex.is_match(line) {
                        matches.push(GrepMatch {
                            path: p.to_string(),
                            line: idx + 1,
                            content: line.to_string(),
                        });
                    }
                }
            }
        });
        Ok(matches)
    }

    /// Absolute paths of every file, depth-first
    pub fn all_file_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.root.walk(ROOT, &mut |p, n| {
            if n.is_file() {
                paths.push(p.to_string());
            }
        });
        paths
    }

    /// Tab-completion candidates for a partial path
    ///
    /// The input is split at its last `/`; the directory part is listed and
    /// filtered by the remainder as a prefix. Candidates keep the caller's
    /// directory spelling, and directories get a trailing `/`. Hidden entries
    /// are offered only when the prefix starts with `.`.
    pub fn completions(&self, partial: &str) -> Vec<String> {
        let (dir_part, prefix) = match partial.rfind('/') {
            Some(idx) => (&partial[..=idx], &partial[idx + 1..]),
            None => ("", partial),
        };
        let dir_abs = self.resolve_path(dir_part);
        let Some(children) = self.root.lookup(&dir_abs).and_then(Node::children) else {
            return Vec::new();
        };

        let show_hidden = prefix.starts_with('.');
        let mut entries: Vec<LsEntry> = children
            .values()
            .filter(|c| c.name().starts_with(prefix))
            .filter(|c| show_hidden || !c.name().starts_with('.'))
            .map(|c| make_entry(c, &path::join_path(&dir_abs, c.name()), false))
            .collect();
        sort_entries(&mut entries);

        entries
            .into_iter()
            .map(|e| {
                let suffix = if e.is_dir() { "/" } else { "" };
                format!("{}{}{}", dir_part, e.name, suffix)
            })
            .collect()
    }

    /// Whether a path exists
    pub fn exists(&self, path: &str) -> bool {
        self.root.lookup(&self.resolve_path(path)).is_some()
    }

    /// Whether a path is an existing directory
    pub fn is_directory(&self, path: &str) -> bool {
        self.root
            .lookup(&self.resolve_path(path))
            .is_some_and(Node::is_dir)
    }

    /// Whether a path is an existing file
    pub fn is_file(&self, path: &str) -> bool {
        self.root
            .lookup(&self.resolve_path(path))
            .is_some_and(Node::is_file)
    }

    /// Bytes used in the backing store against its quota
    pub fn storage_usage(&self) -> Result<StorageUsage> {
        Ok(StorageUsage {
            used_bytes: self.store.used_bytes()?,
            quota_bytes: self.store.quota(),
        })
    }

    /// Discard everything and rebuild the default contents
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        info!("Resetting filesystem to defaults");
        self.root = default_tree_or_empty(&self.home_dir, &self.user);
        self.cwd = self.home_dir.clone();
        self.persist();
    }

    /// Make the tree's tracked files match `target`
    ///
    /// Files in `previous` but not in `target` are removed, every file in
    /// `target` is written (creating parent directories), and anything else
    /// is left alone. All conflicts are checked before the tree is touched,
    /// so a failed restore changes nothing.
    #[instrument(skip_all, fields(files = target.len()))]
    pub fn restore_from_snapshot(&mut self, target: &Snapshot, previous: &Snapshot) -> Result<RestoreResult> {
        let doomed: Vec<&String> = previous
            .keys()
            .filter(|p| !target.contains_key(*p))
            .filter(|p| self.root.lookup(p).is_some_and(Node::is_file))
            .collect();

        for file_path in target.keys() {
            self.check_restorable(file_path, &doomed)?;
        }

        let mut result = RestoreResult::default();

        for file_path in doomed {
            self.detach(file_path)?;
            trace!("Removed {}", file_path);
            result.files_removed += 1;
        }

        for (file_path, content) in target {
            result.directories_created += self.ensure_dir_all(&path::parent_path(file_path))?;
            match self.root.lookup_mut(file_path) {
                Some(node) => {
                    if node.content() != Some(content.as_str()) {
                        node.set_content(content.as_str());
                        result.files_written += 1;
                    }
                }
                None => {
                    self.insert_node(file_path, Node::file(path::base_name(file_path), content.as_str()))?;
                    result.files_written += 1;
                }
            }
        }

        self.validate_cwd();
        debug!(
            "Restored snapshot: {} written, {} removed, {} directories created",
            result.files_written, result.files_removed, result.directories_created
        );
        self.persist();
        Ok(result)
    }

    fn check_restorable(&self, file_path: &str, doomed: &[&String]) -> Result<()> {
        let mut current = String::from(ROOT);
        let mut node = &self.root;
        for seg in path::segments(file_path) {
            current = path::join_path(&current, seg);
            let Some(child) = node.child(seg) else {
                return Ok(());
            };
            if current == file_path {
                if child.is_dir() {
                    return Err(TermfsError::IsADirectory(current));
                }
                return Ok(());
            }
            if child.is_file() && !doomed.iter().any(|d| **d == current) {
                return Err(TermfsError::NotADirectory(current));
            }
            node = child;
        }
        Ok(())
    }

    fn require(&self, abs: &str) -> Result<&Node> {
        self.root
            .lookup(abs)
            .ok_or_else(|| TermfsError::NotFound(abs.to_string()))
    }

    fn parent_dir_mut(&mut self, abs: &str) -> Result<&mut Node> {
        let parent = path::parent_path(abs);
        match self.root.lookup_mut(&parent) {
            Some(node) if node.is_dir() => Ok(node),
            Some(_) => Err(TermfsError::NotADirectory(parent)),
            None => Err(TermfsError::NotFound(parent)),
        }
    }

    fn insert_node(&mut self, abs: &str, node: Node) -> Result<()> {
        let parent = self.parent_dir_mut(abs)?;
        parent
            .insert_child(node)
            .map_err(|_| TermfsError::NotADirectory(path::parent_path(abs)))?;
        Ok(())
    }

    fn detach(&mut self, abs: &str) -> Result<Node> {
        let name = path::base_name(abs).to_string();
        let parent = self.parent_dir_mut(abs)?;
        parent
            .remove_child(&name)
            .ok_or_else(|| TermfsError::NotFound(abs.to_string()))
    }

    fn remove_node(&mut self, abs: &str) -> Result<()> {
        self.detach(abs)?;
        if path::is_within(&self.cwd, abs) {
            self.cwd = path::parent_path(abs);
            debug!("cwd was removed, moved to {}", self.cwd);
        }
        debug!("rm {}", abs);
        Ok(())
    }

    /// Compute where a copy or move of `src_abs` to `dest` lands
    fn transfer_target(&self, src_abs: &str, dest: &str, verb: &str) -> Result<String> {
        let src_node = self.require(src_abs)?;
        let dest_abs = self.resolve_path(dest);

        let target = match self.root.lookup(&dest_abs) {
            Some(node) if node.is_dir() => path::join_path(&dest_abs, path::base_name(src_abs)),
            _ => dest_abs,
        };

        if target == src_abs {
            return Err(TermfsError::invalid_input(format!(
                "'{}' and '{}' are the same file",
                src_abs, target
            )));
        }
        if path::is_within(&target, src_abs) {
            return Err(TermfsError::invalid_input(format!(
                "cannot {} '{}' into itself",
                verb, src_abs
            )));
        }

        if let Some(existing) = self.root.lookup(&target) {
            match (src_node.is_dir(), existing.is_dir()) {
                (false, false) => {}
                (false, true) => return Err(TermfsError::IsADirectory(target)),
                (true, false) => return Err(TermfsError::NotADirectory(target)),
                (true, true) => return Err(TermfsError::AlreadyExists(target)),
            }
        }

        match self.root.lookup(&path::parent_path(&target)) {
            Some(parent) if parent.is_dir() => Ok(target),
            Some(_) => Err(TermfsError::NotADirectory(path::parent_path(&target))),
            None => Err(TermfsError::NotFound(path::parent_path(&target))),
        }
    }

    /// Create every missing directory along `abs`, returning how many were made
    fn ensure_dir_all(&mut self, abs: &str) -> Result<usize> {
        let mut created = 0;
        let mut current = String::from(ROOT);
        let mut node = &mut self.root;

        for seg in path::segments(abs) {
            current = path::join_path(&current, seg);
            if node.child(seg).is_none() {
                node.insert_child(Node::directory(seg))
                    .map_err(|_| TermfsError::NotADirectory(path::parent_path(&current)))?;
                created += 1;
            }
            node = node
                .child_mut(seg)
                .ok_or_else(|| TermfsError::NotFound(current.clone()))?;
            if !node.is_dir() {
                return Err(TermfsError::NotADirectory(current));
            }
        }
        Ok(created)
    }

    /// Reset an invalid cwd to home (or `/`); returns whether it changed
    fn validate_cwd(&mut self) -> bool {
        let normalized = path::normalize(&self.cwd);
        if self.root.lookup(&normalized).is_some_and(Node::is_dir) {
            let changed = normalized != self.cwd;
            self.cwd = normalized;
            return changed;
        }

        let fallback = if self.root.lookup(&self.home_dir).is_some_and(Node::is_dir) {
            self.home_dir.clone()
        } else {
            ROOT.to_string()
        };
        warn!("Working directory {} is invalid, resetting to {}", self.cwd, fallback);
        self.cwd = fallback;
        true
    }

    fn load_state(&self) -> Option<FsState> {
        let json = match self.store.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read filesystem state: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<VersionProbe>(&json) {
            Ok(probe) if probe.version == FS_SCHEMA_VERSION => {}
            Ok(probe) => {
                warn!(
                    "Discarding filesystem state with schema version {} (expected {})",
                    probe.version, FS_SCHEMA_VERSION
                );
                return None;
            }
            Err(e) => {
                warn!("Discarding unreadable filesystem state: {}", e);
                return None;
            }
        }

        match serde_json::from_str::<FsState>(&json) {
            Ok(state) if state.root.is_dir() => Some(state),
            Ok(_) => {
                warn!("Discarding filesystem state whose root is not a directory");
                None
            }
            Err(e) => {
                warn!("Discarding unreadable filesystem state: {}", e);
                None
            }
        }
    }

    fn persist(&self) {
        let state = FsStateRef {
            version: FS_SCHEMA_VERSION,
            root: &self.root,
            cwd: &self.cwd,
        };
        let json = match serde_json::to_string(&state) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize filesystem state: {}", e);
                return;
            }
        };
        match self.store.set(&self.key, &json) {
            Ok(()) => trace!("Persisted filesystem state ({} bytes)", json.len()),
            Err(e) => warn!("Failed to persist filesystem state: {}", e),
        }
    }
}

fn require_operand(path: &str, command: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(TermfsError::invalid_input(format!("{}: missing operand", command)));
    }
    Ok(())
}

fn make_entry(node: &Node, abs: &str, long: bool) -> LsEntry {
    LsEntry {
        name: node.name().to_string(),
        path: abs.to_string(),
        node_type: node.node_type(),
        details: long.then(|| EntryDetails {
            size: node.size(),
            created_at: node.created_at(),
            modified_at: node.modified_at(),
        }),
    }
}

fn sort_entries(entries: &mut [LsEntry]) {
    entries.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name)));
}

/// Translate a `*`/`?` glob into an anchored regex over a bare name
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    source.push('$');

    Regex::new(&source).map_err(|e| TermfsError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Default contents, or an empty root if they cannot be assembled
fn default_tree_or_empty(home_dir: &str, user: &str) -> Node {
    default_tree(home_dir, user).unwrap_or_else(|e| {
        warn!("Failed to build default filesystem, starting empty: {}", e);
        Node::root()
    })
}

/// Insert `children` into `dir`, replacing entries with the same name
fn with_children(mut dir: Node, children: impl IntoIterator<Item = Node>) -> Result<Node> {
    for child in children {
        dir.insert_child(child)
            .map_err(|_| TermfsError::NotADirectory(dir.name().to_string()))?;
    }
    Ok(dir)
}

fn default_tree(home_dir: &str, user: &str) -> Result<Node> {
    let etc = with_children(
        Node::directory("etc"),
        [
            Node::file("hostname", "termfs\n"),
            Node::file(
                "motd",
                format!("Welcome to termfs, {}!\nType 'help' to get started.\n", user),
            ),
        ],
    )?;
    let mut root = with_children(Node::root(), [etc, Node::directory("tmp")])?;

    let projects = with_children(
        Node::directory("projects"),
        [Node::file(
            "hello.rs",
            "fn main() {\n    println!(\"Hello, world!\");\n}\n",
        )],
    )?;
    let home = with_children(
        Node::directory(path::base_name(home_dir)),
        [
            Node::file(
                "README.md",
                "# Home\n\nThis is a virtual filesystem. Files live in memory and are saved automatically.\n",
            ),
            Node::file("notes.txt", "- try `ls -a`\n- try `git init`\n"),
            Node::file(".profile", format!("export USER={}\n", user)),
            projects,
        ],
    )?;

    // Wrap the home directory in its ancestors, innermost first
    let parent = path::parent_path(home_dir);
    let mut ancestors: Vec<&str> = path::segments(&parent).collect();
    let mut subtree = home;
    while let Some(name) = ancestors.pop() {
        subtree = with_children(Node::directory(name), [subtree])?;
    }

    if home_dir == ROOT {
        // Home at the root: merge the home contents straight into the root
        return with_children(root, subtree.children().into_iter().flat_map(|c| c.values().cloned()));
    }

    // `/etc` or `/tmp` may already exist; merge one level deep
    let name = subtree.name().to_string();
    let merged = match root.remove_child(&name) {
        Some(existing) if existing.is_dir() => with_children(
            existing,
            subtree.children().into_iter().flat_map(|c| c.values().cloned()),
        )?,
        _ => subtree,
    };
    with_children(root, [merged])
}

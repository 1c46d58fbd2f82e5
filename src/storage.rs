//! Key-value persistence backends for termfs
//!
//! Both the filesystem and the git engine persist themselves as one JSON blob
//! each, stored under a string key. This module defines the
//! [`KeyValueStore`] seam and ships two implementations:
//!
//! - [`MemoryStore`]: process-local map, used for tests and ephemeral sessions
//! - [`FileStore`]: one file per key in a directory, written atomically
//!
//! ## Layout of a `FileStore`
//!
//! ```text
//! store_root/
//! ├── termfs.filesystem.json
//! └── termfs.git.json
//! ```
//!
//! Both backends can enforce a byte quota over the sum of key and value
//! lengths. A write that would exceed it fails with
//! [`TermfsError::QuotaExceeded`] and leaves the previous value in place.
//!
//! ## Thread Safety
//!
//! Backends are `Send + Sync`. Callers are still expected to serialize whole
//! logical commands; the stores only guarantee that individual calls do not
//! interleave.

use crate::error::{Result, TermfsError};
use crate::utils;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Default quota applied by [`crate::WorkspaceBuilder`], matching typical browser storage
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Synchronous string key-value store
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored
    fn keys(&self) -> Result<Vec<String>>;

    /// Configured quota in bytes, if any
    fn quota(&self) -> Option<u64>;

    /// Bytes used across all keys (key length plus value length)
    fn used_bytes(&self) -> Result<u64> {
        let mut total = 0u64;
        for key in self.keys()? {
            let value_len = self.get(&key)?.map(|v| v.len() as u64).unwrap_or(0);
            total += key.len() as u64 + value_len;
        }
        Ok(total)
    }
}

fn check_quota(quota: Option<u64>, used_without_key: u64, key: &str, value: &str) -> Result<()> {
    if let Some(quota) = quota {
        let needed = used_without_key + key.len() as u64 + value.len() as u64;
        if needed > quota {
            return Err(TermfsError::QuotaExceeded { needed, quota });
        }
    }
    Ok(())
}

/// In-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    quota: Option<u64>,
}

impl MemoryStore {
    /// Create an unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes beyond `quota` bytes
    pub fn with_quota(quota: u64) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            quota: Some(quota),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write();
        let used_without_key: u64 = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum();
        check_quota(self.quota, used_without_key, key, value)?;
        entries.insert(key.to_string(), value.to_string());
        trace!("Stored {} bytes under {}", value.len(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn quota(&self) -> Option<u64> {
        self.quota
    }

    fn used_bytes(&self) -> Result<u64> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum())
    }
}

/// Directory-backed key-value store
///
/// Each key maps to `<root>/<key>.json`. Keys may only contain ASCII
/// alphanumerics, `.`, `-` and `_`.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    quota: Option<u64>,
    write_lock: Mutex<()>,
}

const FILE_SUFFIX: &str = ".json";

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)?;
            info!("Initialized file store at {:?}", root);
        } else if !root.is_dir() {
            return Err(TermfsError::storage(format!(
                "store path {:?} is not a directory",
                root
            )));
        }
        Ok(Self {
            root,
            quota: None,
            write_lock: Mutex::new(()),
        })
    }

    /// Set a byte quota on the store
    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            && !key.starts_with('.');
        if !valid {
            return Err(TermfsError::storage(format!("invalid store key: {:?}", key)));
        }
        Ok(self.root.join(format!("{}{}", key, FILE_SUFFIX)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let _guard = self.write_lock.lock();

        if self.quota.is_some() {
            let mut used_without_key = 0u64;
            for other in self.keys()? {
                if other != key {
                    let len = self.get(&other)?.map(|v| v.len()).unwrap_or(0);
                    used_without_key += (other.len() + len) as u64;
                }
            }
            check_quota(self.quota, used_without_key, key, value)?;
        }

        utils::atomic_write(&path, value.as_bytes())?;
        debug!("Wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(key) = name.strip_suffix(FILE_SUFFIX) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn quota(&self) -> Option<u64> {
        self.quota
    }
}

//! Workspace context and builder
//!
//! A [`Workspace`] bundles one [`FileSystem`] and one [`GitStore`] sharing a
//! single [`KeyValueStore`]. Command handlers receive the workspace
//! explicitly, so independent sessions (and tests) never share state.
//!
//! ## Examples
//!
//! ```rust
//! use termfs::WorkspaceBuilder;
//!
//! # fn main() -> termfs::Result<()> {
//! let mut ws = WorkspaceBuilder::new()
//!     .user("ada")
//!     .home_dir("/home/ada")
//!     .build_in_memory()?;
//!
//! ws.git.init()?;
//! ws.filesystem.write_file("notes.md", "# ideas")?;
//! ws.git.add(&ws.filesystem, "notes.md")?;
//! ws.git.commit(&ws.filesystem, "Add notes")?;
//!
//! let status = ws.git.status(&ws.filesystem)?;
//! assert!(!status.has_changes());
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, TermfsError};
use crate::filesystem::FileSystem;
use crate::git::GitStore;
use crate::path;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::types::{StorageUsage, WorkspaceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// A filesystem and its repository over one store
pub struct Workspace {
    /// The virtual filesystem
    pub filesystem: FileSystem,
    /// The git engine tracking it
    pub git: GitStore,
    config: WorkspaceConfig,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("filesystem", &self.filesystem)
            .field("git", &self.git)
            .field("config", &self.config)
            .finish()
    }
}

impl Workspace {
    /// In-memory workspace with default settings
    pub fn in_memory() -> Result<Self> {
        WorkspaceBuilder::new().build_in_memory()
    }

    /// File-backed workspace with default settings
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        WorkspaceBuilder::new().open(dir)
    }

    /// Configuration the workspace was built with
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Backing store
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Storage consumed by both persisted blobs
    pub fn storage_usage(&self) -> Result<StorageUsage> {
        self.filesystem.storage_usage()
    }

    /// Reset both the filesystem and the repository to defaults
    pub fn reset(&mut self) {
        info!("Resetting workspace");
        self.filesystem.reset();
        self.git.reset_state();
    }
}

/// Builder for [`Workspace`]
#[derive(Debug, Clone, Default)]
pub struct WorkspaceBuilder {
    config: WorkspaceConfig,
}

impl WorkspaceBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: WorkspaceConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the home directory (must be absolute)
    pub fn home_dir(mut self, home_dir: impl Into<String>) -> Self {
        self.config.home_dir = home_dir.into();
        self
    }

    /// Set the user name written into the default files
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config.user = user.into();
        self
    }

    /// Set the prefix of the store keys
    ///
    /// Two workspaces with different prefixes can share one store.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Set the byte quota of stores created by the builder (`None` = unlimited)
    ///
    /// Ignored by [`WorkspaceBuilder::build_with_store`], where the caller
    /// configures the store.
    pub fn storage_quota(mut self, quota: Option<u64>) -> Self {
        self.config.storage_quota = quota;
        self
    }

    /// Build over a fresh [`MemoryStore`]
    pub fn build_in_memory(self) -> Result<Workspace> {
        let store = match self.config.storage_quota {
            Some(quota) => MemoryStore::with_quota(quota),
            None => MemoryStore::new(),
        };
        self.build_with_store(Arc::new(store))
    }

    /// Build over a [`FileStore`] rooted at `dir`
    pub fn open(self, dir: impl Into<PathBuf>) -> Result<Workspace> {
        let mut store = FileStore::open(dir)?;
        if let Some(quota) = self.config.storage_quota {
            store = store.with_quota(quota);
        }
        self.build_with_store(Arc::new(store))
    }

    /// Build over a caller-supplied store and load both blobs
    pub fn build_with_store(self, store: Arc<dyn KeyValueStore>) -> Result<Workspace> {
        let config = self.validated()?;
        let mut filesystem = FileSystem::new(store.clone(), &config);
        let mut git = GitStore::new(store.clone(), &config);
        filesystem.initialize()?;
        git.initialize()?;
        debug!("Workspace ready, cwd {}", filesystem.cwd());

        Ok(Workspace {
            filesystem,
            git,
            config,
            store,
        })
    }

    fn validated(self) -> Result<WorkspaceConfig> {
        let mut config = self.config;
        if !config.home_dir.starts_with('/') {
            return Err(TermfsError::invalid_input(format!(
                "home directory must be absolute: {}",
                config.home_dir
            )));
        }
        config.home_dir = path::normalize(&config.home_dir);
        if config.user.trim().is_empty() {
            return Err(TermfsError::invalid_input("user name must not be empty"));
        }
        let prefix_ok = !config.key_prefix.is_empty()
            && config
                .key_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !prefix_ok {
            return Err(TermfsError::invalid_input(format!(
                "invalid key prefix: {:?}",
                config.key_prefix
            )));
        }
        Ok(config)
    }
}

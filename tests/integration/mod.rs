//! Multi-step integration tests for termfs
//!
//! Drives a workspace through branching histories and checks that the tree,
//! the branch pointers and the persisted state stay consistent.

use ::termfs::*;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

/// Test harness recording every operation applied to a workspace
pub struct WorkspaceTestHarness {
    pub ws: Workspace,
    pub operation_log: Vec<TestOperation>,
}

#[derive(Debug, Clone)]
pub enum TestOperation {
    Write { path: String, content: String },
    Remove { path: String },
    Commit { hash: String, message: String },
    Checkout { target: String },
    Merge { source: String },
}

impl WorkspaceTestHarness {
    /// Create a harness over an in-memory workspace with an initialized repository
    pub fn new() -> Self {
        let mut ws = WorkspaceBuilder::new()
            .storage_quota(None)
            .build_in_memory()
            .unwrap();
        ws.git.init().unwrap();
        Self {
            ws,
            operation_log: Vec::new(),
        }
    }

    /// Write a file, creating parent directories
    pub fn write(&mut self, path: &str, content: &str) -> anyhow::Result<()> {
        let parent = termfs::path::parent_path(path);
        let mut current = String::from("/");
        for seg in termfs::path::segments(&parent) {
            current = termfs::path::join_path(&current, seg);
            if !self.ws.filesystem.exists(&current) {
                self.ws.filesystem.mkdir(&current)?;
            }
        }
        self.ws.filesystem.write_file(path, content)?;
        self.operation_log.push(TestOperation::Write {
            path: path.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    /// Remove a file
    pub fn remove(&mut self, path: &str) -> anyhow::Result<()> {
        self.ws.filesystem.rm(path, RmOptions::default())?;
        self.operation_log.push(TestOperation::Remove {
            path: path.to_string(),
        });
        Ok(())
    }

    /// Stage everything and commit
    pub fn commit_all(&mut self, message: &str) -> anyhow::Result<String> {
        self.ws.git.add_all(&self.ws.filesystem)?;
        let commit = self.ws.git.commit(&self.ws.filesystem, message)?;
        self.operation_log.push(TestOperation::Commit {
            hash: commit.hash.clone(),
            message: message.to_string(),
        });
        Ok(commit.hash)
    }

    pub fn checkout(&mut self, target: &str) -> anyhow::Result<CheckoutResult> {
        let result = self.ws.git.checkout(&mut self.ws.filesystem, target)?;
        self.operation_log.push(TestOperation::Checkout {
            target: target.to_string(),
        });
        Ok(result)
    }

    pub fn merge(&mut self, source: &str) -> anyhow::Result<MergeOutcome> {
        let outcome = self.ws.git.merge(&mut self.ws.filesystem, source)?;
        self.operation_log.push(TestOperation::Merge {
            source: source.to_string(),
        });
        Ok(outcome)
    }

    /// Content of every file below `/work`
    pub fn work_tree(&self) -> Vec<(String, String)> {
        self.ws
            .filesystem
            .all_file_paths()
            .into_iter()
            .filter(|p| p.starts_with("/work/"))
            .map(|p| {
                let content = self.ws.filesystem.cat(&p).unwrap();
                (p, content)
            })
            .collect()
    }

    /// Hashes on the current branch, newest first
    pub fn history(&self) -> Vec<String> {
        self.ws
            .git
            .log(None)
            .unwrap()
            .into_iter()
            .map(|e| e.hash)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_branching_history_navigation() {
        let mut harness = WorkspaceTestHarness::new();

        harness.write("/work/readme.md", "v1").unwrap();
        let base = harness.commit_all("base").unwrap();

        harness.ws.git.branch("feature").unwrap();
        harness.ws.git.branch("hotfix").unwrap();

        harness.checkout("feature").unwrap();
        harness.write("/work/src/feature.rs", "fn feature() {}").unwrap();
        let feature_1 = harness.commit_all("feature part 1").unwrap();
        harness.write("/work/src/feature.rs", "fn feature() { todo() }").unwrap();
        let feature_2 = harness.commit_all("feature part 2").unwrap();
        assert_eq!(harness.history(), vec![feature_2.clone(), feature_1.clone(), base.clone()]);

        harness.checkout("hotfix").unwrap();
        assert!(!harness.ws.filesystem.exists("/work/src/feature.rs"));
        harness.write("/work/readme.md", "v1 fixed").unwrap();
        harness.commit_all("hotfix").unwrap();

        // main can take either branch, but not both
        harness.checkout("main").unwrap();
        assert_eq!(harness.work_tree(), vec![("/work/readme.md".to_string(), "v1".to_string())]);
        assert!(matches!(harness.merge("feature").unwrap(), MergeOutcome::FastForward { .. }));
        assert_eq!(harness.history()[0], feature_2);

        let err = harness.ws.git.merge(&mut harness.ws.filesystem, "hotfix").unwrap_err();
        assert!(matches!(err, TermfsError::NonFastForward { .. }));
        assert_eq!(harness.ws.git.head(), Some(feature_2.as_str()));

        info!("Applied {} operations", harness.operation_log.len());
    }

    #[test]
    #[traced_test]
    fn test_fast_forward_contains_all_source_commits() {
        let mut harness = WorkspaceTestHarness::new();
        harness.write("/work/a", "0").unwrap();
        harness.commit_all("c0").unwrap();
        harness.ws.git.branch("long").unwrap();
        harness.checkout("long").unwrap();

        for i in 1..=10 {
            harness.write("/work/a", &i.to_string()).unwrap();
            harness.commit_all(&format!("c{}", i)).unwrap();
        }
        let source_history = harness.history();

        harness.checkout("main").unwrap();
        harness.merge("long").unwrap();

        assert_eq!(harness.history(), source_history);
        assert_eq!(harness.ws.filesystem.cat("/work/a").unwrap(), "10");
    }

    #[test]
    fn test_deletions_round_trip_through_checkout() {
        let mut harness = WorkspaceTestHarness::new();
        harness.write("/work/keep", "k").unwrap();
        harness.write("/work/drop", "d").unwrap();
        harness.commit_all("both").unwrap();
        harness.ws.git.branch("before").unwrap();

        harness.remove("/work/drop").unwrap();
        let status = harness.ws.git.status(&harness.ws.filesystem).unwrap();
        assert_eq!(
            status.unstaged,
            vec![StatusEntry {
                path: "/work/drop".into(),
                change: ChangeKind::Deleted
            }]
        );
        harness.commit_all("drop one").unwrap();

        harness.checkout("before").unwrap();
        assert_eq!(harness.ws.filesystem.cat("/work/drop").unwrap(), "d");
        harness.checkout("main").unwrap();
        assert!(!harness.ws.filesystem.exists("/work/drop"));
        assert!(harness.ws.filesystem.exists("/work/keep"));
    }

    #[test]
    fn test_detached_checkout_then_return_to_branch() {
        let mut harness = WorkspaceTestHarness::new();
        harness.write("/work/file", "one").unwrap();
        let first = harness.commit_all("one").unwrap();
        harness.write("/work/file", "two").unwrap();
        let second = harness.commit_all("two").unwrap();

        let result = harness.checkout(&first[..5]).unwrap();
        assert!(result.detached);
        assert_eq!(harness.ws.filesystem.cat("/work/file").unwrap(), "one");
        assert_eq!(harness.ws.git.head(), Some(second.as_str()));

        // Checking out the current branch leaves the detached state
        harness.checkout("main").unwrap();
        assert_eq!(harness.ws.git.detached_head(), None);
        assert_eq!(harness.ws.filesystem.cat("/work/file").unwrap(), "two");
    }

    #[test]
    fn test_file_backed_session_reload() {
        let temp_dir = TempDir::new().unwrap();
        let head = {
            let mut ws = Workspace::open(temp_dir.path()).unwrap();
            ws.git.init().unwrap();
            ws.filesystem.mkdir("/tmp/project").unwrap();
            ws.filesystem.write_file("/tmp/project/main.rs", "fn main() {}").unwrap();
            ws.git.add(&ws.filesystem, "/tmp/project").unwrap();
            let commit = ws.git.commit(&ws.filesystem, "initial").unwrap();
            ws.git.branch("dev").unwrap();
            ws.git.checkout(&mut ws.filesystem, "dev").unwrap();
            ws.filesystem.cd("/tmp/project").unwrap();
            commit.hash
        };

        let ws = Workspace::open(temp_dir.path()).unwrap();
        assert_eq!(ws.git.current_branch(), "dev");
        assert_eq!(ws.git.head(), Some(head.as_str()));
        assert_eq!(ws.filesystem.cwd(), "/tmp/project");
        assert_eq!(ws.filesystem.cat("main.rs").unwrap(), "fn main() {}");
        assert!(temp_dir.path().join("termfs.git.json").exists());
    }

    #[test]
    fn test_quota_failures_do_not_lose_session_state() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::with_quota(16 * 1024));
        let mut ws = WorkspaceBuilder::new().build_with_store(store.clone()).unwrap();
        ws.git.init().unwrap();

        let big = "x".repeat(32 * 1024);
        ws.filesystem.write_file("/tmp/big", &big).unwrap();
        assert_eq!(ws.filesystem.cat("/tmp/big").unwrap().len(), big.len());

        // The store still holds the last state that fit
        let reloaded = WorkspaceBuilder::new().build_with_store(store).unwrap();
        assert!(!reloaded.filesystem.exists("/tmp/big"));
    }
}

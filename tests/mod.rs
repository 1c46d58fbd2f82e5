//! Main test module for termfs
//!
//! This module includes all test suites:
//! - Integration tests for multi-branch workflows
//! - Property-based tests for invariants
//! - Edge cases around paths, persistence and recovery

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::termfs::*;
    use std::sync::Arc;

    fn store_with(key: &str, value: &str) -> Arc<dyn KeyValueStore> {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(key, value).unwrap();
        store
    }

    #[test]
    fn test_empty_inputs() {
        let mut ws = Workspace::in_memory().unwrap();
        assert_eq!(ws.filesystem.resolve_path(""), "/home/user");
        assert!(ws.filesystem.ls(Some(""), LsOptions::default()).is_ok());

        for result in [
            ws.filesystem.touch(""),
            ws.filesystem.mkdir(""),
            ws.filesystem.write_file("", "x"),
            ws.filesystem.rm("", RmOptions::default()),
        ] {
            let err = result.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_special_filenames() {
        let mut ws = Workspace::in_memory().unwrap();
        let names = [
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file_with_underscores.txt",
            "文件.txt",
            "émoji🎉.txt",
            "a.b.c.d",
        ];
        for name in names {
            let path = format!("/tmp/{}", name);
            ws.filesystem.write_file(&path, name).unwrap();
            assert_eq!(ws.filesystem.cat(&path).unwrap(), name);
        }
        assert_eq!(ws.filesystem.find("/tmp", "*.txt").unwrap().len(), 5);
        assert_eq!(ws.filesystem.find("/tmp", "a.b.?.d").unwrap(), vec!["/tmp/a.b.c.d"]);
    }

    #[test]
    fn test_deep_nesting() {
        let mut ws = Workspace::in_memory().unwrap();
        let mut dir = String::from("/tmp");
        for i in 0..50 {
            dir = format!("{}/level{}", dir, i);
            ws.filesystem.mkdir(&dir).unwrap();
        }
        ws.filesystem.write_file(&format!("{}/leaf", dir), "deep").unwrap();
        ws.filesystem.cd(&dir).unwrap();

        let up: Vec<&str> = vec![".."; 60];
        assert_eq!(ws.filesystem.cd(&up.join("/")).unwrap(), "/");

        ws.filesystem.rm("/tmp/level0", RmOptions { recursive: true }).unwrap();
        assert!(ws.filesystem.is_directory("/tmp"));
        assert!(!ws.filesystem.exists("/tmp/level0"));
    }

    #[test]
    fn test_root_is_protected() {
        let mut ws = Workspace::in_memory().unwrap();
        assert_eq!(
            ws.filesystem.rm("/", RmOptions { recursive: true }).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(ws.filesystem.mv("/", "/tmp/root").unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(ws.filesystem.rmdir("/..").unwrap_err().kind(), ErrorKind::InvalidInput);
        assert!(ws.filesystem.is_directory("/"));
        // Touching the root only bumps its timestamp
        ws.filesystem.touch("/").unwrap();
    }

    #[test]
    fn test_hidden_entries() {
        let mut ws = Workspace::in_memory().unwrap();
        ws.filesystem.mkdir("/tmp/.cache").unwrap();
        ws.filesystem.write_file("/tmp/visible", "").unwrap();

        let plain = ws.filesystem.ls(Some("/tmp"), LsOptions::default()).unwrap();
        assert_eq!(plain.len(), 1);
        let all = ws
            .filesystem
            .ls(Some("/tmp"), LsOptions { all: true, long: false })
            .unwrap();
        assert_eq!(all[0].name, ".cache");

        // find does not hide dotfiles
        assert_eq!(ws.filesystem.find("/tmp", ".*").unwrap(), vec!["/tmp/.cache"]);
    }

    #[test]
    fn test_schema_mismatch_rebuilds_defaults() {
        let store = store_with(
            "termfs.filesystem",
            r#"{"version":0,"root":{"name":"","type":"directory","children":{}},"cwd":"/"}"#,
        );
        let ws = WorkspaceBuilder::new().build_with_store(store.clone()).unwrap();
        assert!(ws.filesystem.is_file("/etc/hostname"));

        // The rebuilt state was persisted with the current version
        let saved: serde_json::Value =
            serde_json::from_str(&store.get("termfs.filesystem").unwrap().unwrap()).unwrap();
        assert_eq!(saved["version"], FS_SCHEMA_VERSION);
    }

    #[test]
    fn test_corrupted_blobs_are_replaced() {
        let store = store_with("termfs.filesystem", "{not json");
        store.set("termfs.git", "[]").unwrap();
        let ws = WorkspaceBuilder::new().build_with_store(store).unwrap();
        assert_eq!(ws.filesystem.cwd(), "/home/user");
        assert!(!ws.git.is_initialized());
    }

    #[test]
    fn test_invalid_cwd_is_corrected_and_persisted() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        {
            let mut ws = WorkspaceBuilder::new().build_with_store(store.clone()).unwrap();
            ws.filesystem.mkdir("/tmp/gone").unwrap();
            ws.filesystem.cd("/tmp/gone").unwrap();
        }

        // Point the persisted cwd at a directory that does not exist
        let json = store.get("termfs.filesystem").unwrap().unwrap();
        let mut state: serde_json::Value = serde_json::from_str(&json).unwrap();
        state["cwd"] = serde_json::Value::String("/nowhere/at/all".to_string());
        store.set("termfs.filesystem", &state.to_string()).unwrap();

        let ws = WorkspaceBuilder::new().build_with_store(store.clone()).unwrap();
        assert_eq!(ws.filesystem.cwd(), "/home/user");

        let saved: serde_json::Value =
            serde_json::from_str(&store.get("termfs.filesystem").unwrap().unwrap()).unwrap();
        assert_eq!(saved["cwd"], "/home/user");
    }

    #[test]
    fn test_error_messages_are_user_facing() {
        let mut ws = Workspace::in_memory().unwrap();
        let err = ws.filesystem.cat("/tmp").unwrap_err();
        assert_eq!(err.to_string(), "Is a directory: /tmp");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);

        let err = ws.git.commit(&ws.filesystem, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);

        ws.git.init().unwrap();
        let err = ws.git.commit(&ws.filesystem, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    }

    #[test]
    fn test_unborn_branch_operations() {
        let mut ws = Workspace::in_memory().unwrap();
        ws.git.init().unwrap();

        let branches = ws.git.list_branches().unwrap();
        assert_eq!(branches.len(), 1);
        assert!(branches[0].is_current);
        assert_eq!(branches[0].head, None);

        assert_eq!(ws.git.branch("feature").unwrap_err().kind(), ErrorKind::PreconditionFailed);
        assert_eq!(ws.git.log(None).unwrap_err().kind(), ErrorKind::PreconditionFailed);
        // Checking out the unborn current branch is a no-op
        let result = ws.git.checkout(&mut ws.filesystem, "main").unwrap();
        assert_eq!(result.commit, None);
        assert!(ws.filesystem.is_file("/etc/hostname"));
    }
}

//! Property-based testing for termfs
//!
//! Uses proptest to check path resolution, file round-trips and history
//! invariants across randomly generated inputs and operation sequences.

use ::termfs::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// One mutation applied to files under `/work`
#[derive(Debug, Clone)]
pub enum FileOperation {
    Write { name: String, content: String },
    Append { name: String, content: String },
    Delete { name: String },
}

fn segment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(|s| s),
        Just(".".to_string()),
        Just("..".to_string()),
        Just(String::new()),
    ]
}

/// Raw paths with dots, duplicate slashes and optional leading slash
fn raw_path_strategy() -> impl Strategy<Value = String> {
    (any::<bool>(), prop::collection::vec(segment_strategy(), 0..8)).prop_map(|(absolute, segs)| {
        let joined = segs.join("/");
        if absolute {
            format!("/{}", joined)
        } else {
            joined
        }
    })
}

fn cwd_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,6}", 0..5).prop_map(|segs| format!("/{}", segs.join("/")))
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "file[0-3]\\.txt".prop_map(|s| s),
        "[a-c]{1,2}\\.(rs|md)".prop_map(|s| s),
    ]
}

fn content_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 \n]{0,200}".prop_map(|s| s)
}

fn file_operation_strategy() -> impl Strategy<Value = FileOperation> {
    prop_oneof![
        (name_strategy(), content_strategy())
            .prop_map(|(name, content)| FileOperation::Write { name, content }),
        (name_strategy(), content_strategy())
            .prop_map(|(name, content)| FileOperation::Append { name, content }),
        name_strategy().prop_map(|name| FileOperation::Delete { name }),
    ]
}

/// Apply an operation to the workspace and to a model of expected contents
fn apply_operation(fs: &mut FileSystem, model: &mut BTreeMap<String, String>, op: &FileOperation) {
    match op {
        FileOperation::Write { name, content } => {
            let path = format!("/work/{}", name);
            fs.write_file(&path, content).unwrap();
            model.insert(path, content.clone());
        }
        FileOperation::Append { name, content } => {
            let path = format!("/work/{}", name);
            fs.append_file(&path, content).unwrap();
            model.entry(path).or_default().push_str(content);
        }
        FileOperation::Delete { name } => {
            let path = format!("/work/{}", name);
            if fs.exists(&path) {
                fs.rm(&path, RmOptions::default()).unwrap();
            }
            model.remove(&path);
        }
    }
}

fn work_files(fs: &FileSystem) -> BTreeMap<String, String> {
    fs.all_file_paths()
        .into_iter()
        .filter(|p| p.starts_with("/work/"))
        .map(|p| {
            let content = fs.cat(&p).unwrap();
            (p, content)
        })
        .collect()
}

fn new_workspace() -> Workspace {
    let mut ws = WorkspaceBuilder::new()
        .storage_quota(None)
        .build_in_memory()
        .unwrap();
    ws.filesystem.mkdir("/work").unwrap();
    ws
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Resolving an already-resolved path changes nothing
    #[test]
    fn resolve_is_idempotent(raw in raw_path_strategy(), cwd in cwd_strategy()) {
        let once = path::resolve(&raw, &cwd);
        prop_assert_eq!(path::resolve(&once, &cwd), once.clone());
        prop_assert!(once.starts_with('/'));
        prop_assert!(!once.contains("//"));
    }

    /// Doubling every slash never changes the result
    #[test]
    fn duplicate_slashes_are_ignored(raw in raw_path_strategy(), cwd in cwd_strategy()) {
        let doubled = raw.replace('/', "//");
        prop_assert_eq!(path::resolve(&doubled, &cwd), path::resolve(&raw, &cwd));
    }

    /// `..` never climbs above the root
    #[test]
    fn parent_never_underflows(depth in 0..20usize) {
        let raw = vec![".."; depth].join("/");
        prop_assert_eq!(path::resolve(&raw, "/"), "/");
    }

    /// cat always returns the latest write/append payload
    #[test]
    fn write_cat_round_trip(
        operations in prop::collection::vec(file_operation_strategy(), 1..40)
    ) {
        let mut ws = new_workspace();
        let mut model = BTreeMap::new();

        for op in &operations {
            apply_operation(&mut ws.filesystem, &mut model, op);
        }

        prop_assert_eq!(work_files(&ws.filesystem), model);
    }

    /// Editing a copy leaves the source untouched
    #[test]
    fn copy_is_isolated(content in content_strategy(), edit in content_strategy()) {
        let mut ws = new_workspace();
        ws.filesystem.mkdir("/work/src").unwrap();
        ws.filesystem.write_file("/work/src/file.txt", &content).unwrap();

        ws.filesystem.cp("/work/src", "/work/dst").unwrap();
        ws.filesystem.write_file("/work/dst/file.txt", &edit).unwrap();

        prop_assert_eq!(ws.filesystem.cat("/work/src/file.txt").unwrap(), content);
        prop_assert_eq!(ws.filesystem.cat("/work/dst/file.txt").unwrap(), edit);
    }

    /// mkdir then rmdir leaves no trace
    #[test]
    fn mkdir_rmdir_restores_absence(name in "[a-z]{1,8}") {
        let mut ws = new_workspace();
        let dir = format!("/work/{}", name);
        ws.filesystem.mkdir(&dir).unwrap();
        ws.filesystem.rmdir(&dir).unwrap();
        prop_assert!(!ws.filesystem.exists(&dir));
    }

    /// Checking out a branch restores exactly what was committed on it
    #[test]
    fn checkout_restores_committed_tree(
        first in prop::collection::vec(file_operation_strategy(), 1..20),
        second in prop::collection::vec(file_operation_strategy(), 1..20)
    ) {
        let mut ws = new_workspace();
        let mut model = BTreeMap::new();
        ws.git.init().unwrap();

        for op in &first {
            apply_operation(&mut ws.filesystem, &mut model, op);
        }
        ws.filesystem.write_file("/work/anchor", "anchor").unwrap();
        ws.git.add_all(&ws.filesystem).unwrap();
        ws.git.commit(&ws.filesystem, "base").unwrap();
        let committed = work_files(&ws.filesystem);

        ws.git.branch("feature").unwrap();
        ws.git.checkout(&mut ws.filesystem, "feature").unwrap();
        for op in &second {
            apply_operation(&mut ws.filesystem, &mut model, op);
        }
        if ws.git.add_all(&ws.filesystem).unwrap() > 0 {
            ws.git.commit(&ws.filesystem, "feature").unwrap();
        }

        ws.git.checkout(&mut ws.filesystem, "main").unwrap();
        prop_assert_eq!(work_files(&ws.filesystem), committed);
    }

    /// After a fast-forward, main's log holds every commit of the source
    #[test]
    fn fast_forward_reaches_every_source_commit(commits in 1..15usize) {
        let mut ws = new_workspace();
        ws.git.init().unwrap();
        ws.filesystem.write_file("/work/counter", "0").unwrap();
        ws.git.add_all(&ws.filesystem).unwrap();
        ws.git.commit(&ws.filesystem, "start").unwrap();

        ws.git.branch("feature").unwrap();
        ws.git.checkout(&mut ws.filesystem, "feature").unwrap();
        for i in 1..=commits {
            ws.filesystem.write_file("/work/counter", &i.to_string()).unwrap();
            ws.git.add(&ws.filesystem, "/work/counter").unwrap();
            ws.git.commit(&ws.filesystem, &format!("step {}", i)).unwrap();
        }
        let feature_log: Vec<String> = ws.git.log(None).unwrap().into_iter().map(|e| e.hash).collect();

        ws.git.checkout(&mut ws.filesystem, "main").unwrap();
        ws.git.merge(&mut ws.filesystem, "feature").unwrap();
        let main_log: Vec<String> = ws.git.log(None).unwrap().into_iter().map(|e| e.hash).collect();

        for hash in &feature_log {
            prop_assert!(main_log.contains(hash));
        }
        prop_assert_eq!(main_log.len(), commits + 1);
    }
}

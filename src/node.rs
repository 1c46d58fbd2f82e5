//! Typed tree nodes for the virtual filesystem
//!
//! A [`Node`] is either a file holding text content or a directory holding
//! named children. Each node is owned by exactly one parent slot: the tree is
//! built only through the mutation methods here, never by aliasing, so it is
//! acyclic by construction and needs no runtime cycle detection.
//!
//! The child map is keyed by name and [`Node::insert_child`] always keys a
//! node by its own name, which keeps the "name equals key" invariant intact.
//!
//! ## Structure
//!
//! ```text
//! /                 (root, name "")
//! ├── home/
//! │   └── user/
//! │       └── README.md
//! └── tmp/
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

use crate::path;

/// Kind of a filesystem node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Regular file with text content
    File,
    /// Directory with named children
    Directory,
}

impl NodeType {
    /// Lowercase label used in listings
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::File => "file",
            NodeType::Directory => "directory",
        }
    }
}

/// A node in the filesystem tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    name: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    #[serde(flatten)]
    body: NodeBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum NodeBody {
    File { content: String },
    Directory { children: BTreeMap<String, Node> },
}

impl Node {
    /// Create a file node stamped with the current time
    pub fn file(name: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            modified_at: now,
            body: NodeBody::File {
                content: content.into(),
            },
        }
    }

    /// Create an empty directory node stamped with the current time
    pub fn directory(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            modified_at: now,
            body: NodeBody::Directory {
                children: BTreeMap::new(),
            },
        }
    }

    /// Create a nameless directory suitable as a tree root
    pub fn root() -> Self {
        Self::directory("")
    }

    /// Node name; empty for the root
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File or directory
    pub fn node_type(&self) -> NodeType {
        match self.body {
            NodeBody::File { .. } => NodeType::File,
            NodeBody::Directory { .. } => NodeType::Directory,
        }
    }

    /// Whether this node is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self.body, NodeBody::Directory { .. })
    }

    /// Whether this node is a file
    pub fn is_file(&self) -> bool {
        matches!(self.body, NodeBody::File { .. })
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification timestamp
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// File content, `None` for directories
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            NodeBody::File { content } => Some(content),
            NodeBody::Directory { .. } => None,
        }
    }

    /// Child map, `None` for files
    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match &self.body {
            NodeBody::Directory { children } => Some(children),
            NodeBody::File { .. } => None,
        }
    }

    /// Whether this is a directory without children
    pub fn is_empty_dir(&self) -> bool {
        self.children().is_some_and(|c| c.is_empty())
    }

    /// Size in bytes: content length for files, total content below a directory
    pub fn size(&self) -> u64 {
        match &self.body {
            NodeBody::File { content } => content.len() as u64,
            NodeBody::Directory { children } => children.values().map(Node::size).sum(),
        }
    }

    /// Bump the modification time
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    /// Replace file content; returns `false` for directories
    pub fn set_content(&mut self, new_content: impl Into<String>) -> bool {
        match &mut self.body {
            NodeBody::File { content } => {
                *content = new_content.into();
                self.modified_at = Utc::now();
                true
            }
            NodeBody::Directory { .. } => false,
        }
    }

    /// Append to file content; returns `false` for directories
    pub fn append_content(&mut self, extra: &str) -> bool {
        match &mut self.body {
            NodeBody::File { content } => {
                content.push_str(extra);
                self.modified_at = Utc::now();
                true
            }
            NodeBody::Directory { .. } => false,
        }
    }

    /// Direct child by name
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children().and_then(|c| c.get(name))
    }

    /// Mutable direct child by name
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        match &mut self.body {
            NodeBody::Directory { children } => children.get_mut(name),
            NodeBody::File { .. } => None,
        }
    }

    /// Insert a child keyed by its own name, returning any node it replaced
    ///
    /// Returns `Err(child)` untouched when `self` is a file.
    pub fn insert_child(&mut self, child: Node) -> std::result::Result<Option<Node>, Node> {
        match &mut self.body {
            NodeBody::Directory { children } => {
                self.modified_at = Utc::now();
                Ok(children.insert(child.name.clone(), child))
            }
            NodeBody::File { .. } => Err(child),
        }
    }

    /// Detach and return a child
    pub fn remove_child(&mut self, name: &str) -> Option<Node> {
        match &mut self.body {
            NodeBody::Directory { children } => {
                let removed = children.remove(name);
                if removed.is_some() {
                    self.modified_at = Utc::now();
                }
                removed
            }
            NodeBody::File { .. } => None,
        }
    }

    /// Rename a detached node before re-inserting it elsewhere
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Follow an absolute path from this node taken as the root
    pub fn lookup(&self, abs_path: &str) -> Option<&Node> {
        let mut node = self;
        for seg in path::segments(abs_path) {
            node = node.child(seg)?;
        }
        Some(node)
    }

    /// Mutable variant of [`Node::lookup`]
    pub fn lookup_mut(&mut self, abs_path: &str) -> Option<&mut Node> {
        let mut node = self;
        for seg in path::segments(abs_path) {
            node = node.child_mut(seg)?;
        }
        Some(node)
    }

    /// Deep copy of this subtree with fresh timestamps on every node
    pub fn fresh_copy(&self) -> Node {
        let now = Utc::now();
        let body = match &self.body {
            NodeBody::File { content } => NodeBody::File {
                content: content.clone(),
            },
            NodeBody::Directory { children } => NodeBody::Directory {
                children: children
                    .iter()
                    .map(|(name, child)| (name.clone(), child.fresh_copy()))
                    .collect(),
            },
        };
        Node {
            name: self.name.clone(),
            created_at: now,
            modified_at: now,
            body,
        }
    }

    /// Visit this node and every descendant depth-first, pre-order
    ///
    /// `abs_path` is the absolute path of `self`; children are visited in
    /// name order.
    pub fn walk<'a, F>(&'a self, abs_path: &str, visit: &mut F)
    where
        F: FnMut(&str, &'a Node),
    {
        visit(abs_path, self);
        if let NodeBody::Directory { children } = &self.body {
            for (name, child) in children {
                child.walk(&path::join_path(abs_path, name), visit);
            }
        }
    }

    /// Force every child's name to match its key, returning the number fixed
    ///
    /// Only needed for blobs that were edited outside this crate.
    pub fn repair_names(&mut self) -> usize {
        let mut fixed = 0;
        if let NodeBody::Directory { children } = &mut self.body {
            for (key, child) in children.iter_mut() {
                if child.name != *key {
                    trace!("Repairing node name {:?} -> {:?}", child.name, key);
                    child.name = key.clone();
                    fixed += 1;
                }
                fixed += child.repair_names();
            }
        }
        fixed
    }
}
